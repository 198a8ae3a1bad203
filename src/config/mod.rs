// Project discovery and layered YAML configuration.

pub mod discovery;
pub mod loader;
pub mod types;

pub use discovery::project_root;
pub use loader::{CONFIG_FILE, HOME_CONFIG_FILE, load};
pub use types::{ConfigLayer, DEFAULT_IMAGE, HOST_USER, Settings};
