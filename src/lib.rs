pub mod cli;
pub mod config;
pub mod console;
pub mod docker;
pub mod error;
pub mod logging;
pub mod pull_output;
pub mod runner;

use console::LineSink;
use docker::DockerEngine;
use error::{ContainerError, RunError, Stage};
use runner::{Outcome, Session};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compared against `MinVersionNumber` in config files.
pub const VERSION_NUMBER: u32 = 100;

/// Run `command` for the project around the current directory.
///
/// Configuration is resolved before the engine is contacted, so config
/// problems are reported even when no engine is reachable.
pub fn run(
    command: Vec<String>,
    interactive: bool,
    console: &mut dyn LineSink,
) -> Result<Outcome, RunError> {
    let session = Session::from_env(command, interactive)?;
    let engine = DockerEngine::connect().map_err(|e| ContainerError::new(Stage::Connect, e))?;
    runner::run(&engine, &session, console)
}
