//! Image-pull progress: newline-delimited engine events rendered as stable,
//! in-place terminal lines.
mod decode;
mod render;

pub use decode::{DecodeError, decode_line};
pub use render::{Flow, LinePositions, ProgressRenderer, PullError};

/// One decoded line of pull output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullEvent {
    Update(PullUpdate),
    /// The engine reported a failure; nothing after it is meaningful.
    Error(String),
}

/// A non-error pull event. Empty strings mean the field was absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullUpdate {
    /// Layer or resource identifier.
    pub id: String,
    pub status: String,
    /// Human-readable progress such as `[=====>   ] 10MB/50MB`.
    pub progress: Option<String>,
    pub has_progress_detail: bool,
    /// Unstructured log chunk.
    pub stream: Option<String>,
}

impl PullUpdate {
    pub fn has_status(&self) -> bool {
        !self.status.is_empty()
    }

    /// Status as shown to the user.
    pub fn status_text(&self) -> &str {
        self.status.trim()
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}
