use std::path::PathBuf;

use crate::config::{self, Settings};
use crate::error::ConfigError;

/// Directory under the system temp dir holding named cache mounts.
pub const CACHE_DIR: &str = "testbox-cache";

/// Everything one run needs, resolved before any container work starts.
#[derive(Debug, Clone)]
pub struct Session {
    pub settings: Settings,
    /// Bind-mounted into the container at the same path.
    pub root_dir: PathBuf,
    /// Where the command runs, inside and outside the container.
    pub work_dir: PathBuf,
    pub command: Vec<String>,
    /// Stdout is a terminal.
    pub interactive: bool,
    /// `NORAW` was set.
    pub no_raw: bool,
    pub cache_root: PathBuf,
}

impl Session {
    /// Resolve a session from the process environment: working directory,
    /// project root, both config layers and `NORAW`.
    pub fn from_env(command: Vec<String>, interactive: bool) -> Result<Self, ConfigError> {
        let work_dir = std::env::current_dir().map_err(ConfigError::WorkDir)?;
        let root_dir = config::project_root(&work_dir)?;
        let home = dirs::home_dir();
        let settings = config::load(&root_dir, home.as_deref())?;
        let no_raw = std::env::var_os("NORAW").is_some_and(|v| !v.is_empty());

        Ok(Self {
            settings,
            root_dir,
            work_dir,
            command,
            interactive,
            no_raw,
            cache_root: std::env::temp_dir().join(CACHE_DIR),
        })
    }

    /// Run the exec with a TTY. Without one the engine multiplexes stdout
    /// and stderr, which is what `NORAW` asks for.
    pub fn exec_tty(&self) -> bool {
        self.interactive && !self.no_raw
    }

    pub fn display_command(&self) -> String {
        shell_words::join(&self.command)
    }
}
