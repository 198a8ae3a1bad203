// Container engine access: connection, image pulls, container lifecycle.

pub mod connect;
pub mod engine;
pub mod pull;
pub mod types;

pub use engine::{ContainerEngine, DockerEngine, host_user};
pub use types::{BindMount, ContainerSpec, CreatedContainer, ExecSpec, image_reference};
