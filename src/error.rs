use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pull_output::PullError;

/// Problems found before any container work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "need to execute commands inside a project (no testbox.yaml or .git found above {})",
        .start.display()
    )]
    NoProjectRoot { start: PathBuf },

    #[error("failed to determine the working directory: {0}")]
    WorkDir(#[source] io::Error),

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error(
        "the tool version is too low, please upgrade the version (requires {required}, have {current})"
    )]
    VersionTooLow { required: i64, current: u32 },

    #[error("invalid command: {0}")]
    Command(#[from] shell_words::ParseError),
}

/// The image could not be made available.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to pull {reference}: {cause:#}")]
    Request {
        reference: String,
        cause: anyhow::Error,
    },

    #[error(transparent)]
    Pull(#[from] PullError),
}

/// Which container-engine call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Cleanup,
    Prepare,
    Create,
    Start,
    Exec,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Connect => f.write_str("connect to the container engine"),
            Stage::Cleanup => f.write_str("remove the previous container"),
            Stage::Prepare => f.write_str("prepare container mounts"),
            Stage::Create => f.write_str("create the container"),
            Stage::Start => f.write_str("start the container"),
            Stage::Exec => f.write_str("execute the command"),
        }
    }
}

/// A container-engine call failed. The container is still cleaned up.
#[derive(Debug, Error)]
#[error("failed to {stage}: {cause:#}")]
pub struct ContainerError {
    pub stage: Stage,
    pub cause: anyhow::Error,
}

impl ContainerError {
    pub fn new(stage: Stage, cause: anyhow::Error) -> Self {
        Self { stage, cause }
    }
}

/// Any internal failure of a run. A non-zero exit from the user's command is
/// not one of these; see [`crate::runner::Outcome`].
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_error_shows_stage_and_cause_chain() {
        let cause = anyhow::anyhow!("no such container").context("exec create failed");
        let err = ContainerError::new(Stage::Exec, cause);
        assert_eq!(
            err.to_string(),
            "failed to execute the command: exec create failed: no such container"
        );
    }

    #[test]
    fn version_gate_message() {
        let err = ConfigError::VersionTooLow {
            required: 200,
            current: 100,
        };
        assert!(err.to_string().starts_with("the tool version is too low"));
    }

    #[test]
    fn pull_errors_surface_unchanged() {
        let err = RunError::from(ImageError::from(PullError::Engine(
            "manifest for x:y not found".into(),
        )));
        assert_eq!(err.to_string(), "manifest for x:y not found");
    }
}
