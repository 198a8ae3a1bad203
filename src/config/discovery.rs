use std::path::{Path, PathBuf};

use super::loader::CONFIG_FILE;
use crate::error::ConfigError;

/// Entries whose presence marks a directory as the project root.
pub const ROOT_MARKERS: [&str; 2] = [CONFIG_FILE, ".git"];

/// Walk from `start` up through its ancestors and return the first directory
/// holding one of [`ROOT_MARKERS`].
pub fn project_root(start: &Path) -> Result<PathBuf, ConfigError> {
    start
        .ancestors()
        .find(|dir| is_project_root(dir))
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::NoProjectRoot {
            start: start.to_path_buf(),
        })
}

fn is_project_root(dir: &Path) -> bool {
    ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists())
}
