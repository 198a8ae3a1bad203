use std::path::PathBuf;

/// Host directory bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Everything needed to create the test container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `KEY=value` pairs.
    pub env: Vec<String>,
    pub working_dir: PathBuf,
    pub mounts: Vec<BindMount>,
    pub network_mode: String,
    pub privileged: bool,
}

/// Result of a successful create.
#[derive(Debug, Clone, Default)]
pub struct CreatedContainer {
    pub id: String,
    pub warnings: Vec<String>,
}

/// The user's command as it runs inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecSpec {
    pub cmd: Vec<String>,
    pub working_dir: PathBuf,
    pub user: Option<String>,
    /// Allocate a TTY; without one stdout/stderr arrive multiplexed.
    pub tty: bool,
}

/// Fully qualify an image name for a pull.
///
/// Names without a registry host get `docker.io/`; names without a tag or
/// digest get `:latest` so the engine does not fetch every tag.
pub fn image_reference(image: &str) -> String {
    let image = image.trim().trim_start_matches('/');
    if image.is_empty() {
        return String::new();
    }

    let mut reference = if has_registry(image) {
        image.to_string()
    } else {
        format!("docker.io/{image}")
    };

    let last = reference.rsplit('/').next().unwrap_or_default();
    if !last.contains(':') && !reference.contains('@') {
        reference.push_str(":latest");
    }
    reference
}

fn has_registry(image: &str) -> bool {
    match image.split_once('/') {
        Some((first, _)) => first.contains('.') || first.contains(':') || first == "localhost",
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_image_gets_hub_prefix() {
        assert_eq!(image_reference("golang:1.22"), "docker.io/golang:1.22");
    }

    #[test]
    fn user_image_gets_hub_prefix() {
        assert_eq!(
            image_reference("goredis/grte:latest"),
            "docker.io/goredis/grte:latest"
        );
        assert_eq!(
            image_reference("/goredis/grte:latest"),
            "docker.io/goredis/grte:latest"
        );
    }

    #[test]
    fn existing_hub_prefix_is_kept() {
        assert_eq!(
            image_reference("docker.io/library/alpine:3.19"),
            "docker.io/library/alpine:3.19"
        );
    }

    #[test]
    fn other_registries_are_left_alone() {
        assert_eq!(
            image_reference("ghcr.io/owner/tools:v2"),
            "ghcr.io/owner/tools:v2"
        );
        assert_eq!(
            image_reference("localhost:5000/ci/runner:1"),
            "localhost:5000/ci/runner:1"
        );
        assert_eq!(image_reference("localhost/runner:1"), "localhost/runner:1");
    }

    #[test]
    fn missing_tag_defaults_to_latest() {
        assert_eq!(image_reference("alpine"), "docker.io/alpine:latest");
        assert_eq!(
            image_reference("localhost:5000/runner"),
            "localhost:5000/runner:latest"
        );
    }

    #[test]
    fn digest_is_not_tagged() {
        assert_eq!(
            image_reference("alpine@sha256:c5b1261d"),
            "docker.io/alpine@sha256:c5b1261d"
        );
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(image_reference(""), "");
    }
}
