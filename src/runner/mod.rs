// One test run: session resolution and the container lifecycle around it.

pub mod orchestrator;
pub mod session;

pub use orchestrator::{CONTAINER_NAME, Outcome, run};
pub use session::Session;
