use std::path::Path;

use tracing::debug;

use super::types::{ConfigLayer, Settings};
use crate::VERSION_NUMBER;
use crate::error::ConfigError;

/// Per-project config file, looked up in the project root.
pub const CONFIG_FILE: &str = "testbox.yaml";

/// Per-user config file, looked up in the home directory.
pub const HOME_CONFIG_FILE: &str = ".testbox.yaml";

/// Load one config file. A missing file is `Ok(None)`; an empty one is an
/// empty layer.
pub fn load_layer(path: &Path) -> Result<Option<ConfigLayer>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if contents.trim().is_empty() {
        return Ok(Some(ConfigLayer::default()));
    }
    let layer = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config layer");
    Ok(Some(layer))
}

/// Resolve settings from the project file, then the home file on top of it,
/// and enforce the minimum tool version.
pub fn load(root: &Path, home: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut layer = ConfigLayer::default();

    if let Some(project) = load_layer(&root.join(CONFIG_FILE))? {
        layer = layer.overlay(project);
    }
    if let Some(home) = home
        && let Some(user) = load_layer(&home.join(HOME_CONFIG_FILE))?
    {
        layer = layer.overlay(user);
    }

    let settings = Settings::resolve(layer);
    check_version(settings.min_version_number)?;
    Ok(settings)
}

pub fn check_version(required: i64) -> Result<(), ConfigError> {
    if i64::from(VERSION_NUMBER) < required {
        return Err(ConfigError::VersionTooLow {
            required,
            current: VERSION_NUMBER,
        });
    }
    Ok(())
}
