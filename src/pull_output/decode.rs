use serde::Deserialize;
use thiserror::Error;

use super::{PullEvent, PullUpdate};

/// A line that is not a JSON object of the expected shape.
#[derive(Debug, Error)]
#[error("unable to unmarshal line [{line}] ==> {source}")]
pub struct DecodeError {
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

/// Wire shape of one pull-output line. Only the fields the renderer uses are
/// kept; everything else the engine sends is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireMessage {
    stream: Option<String>,
    status: Option<String>,
    progress: Option<String>,
    #[serde(rename = "progressDetail")]
    progress_detail: Option<serde_json::Value>,
    id: Option<String>,
    error: Option<String>,
    #[serde(rename = "errorDetail")]
    error_detail: Option<WireErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireErrorDetail {
    message: Option<String>,
}

/// Decode a single line of pull output.
///
/// Each call deserializes into a fresh value, so fields omitted from `line`
/// are always absent in the result regardless of what earlier lines held.
pub fn decode_line(line: &str) -> Result<PullEvent, DecodeError> {
    let wire: WireMessage = serde_json::from_str(line).map_err(|source| DecodeError {
        line: line.to_string(),
        source,
    })?;
    Ok(wire.into_event())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl WireMessage {
    fn into_event(self) -> PullEvent {
        if let Some(error) = non_empty(self.error) {
            return PullEvent::Error(error);
        }
        if let Some(message) = self.error_detail.and_then(|d| non_empty(d.message)) {
            return PullEvent::Error(message);
        }

        PullEvent::Update(PullUpdate {
            id: self.id.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            progress: non_empty(self.progress),
            // `null` deserializes to `None`; `{}` counts as present.
            has_progress_detail: self.progress_detail.is_some(),
            stream: non_empty(self.stream),
        })
    }
}
