use std::collections::HashMap;
use std::io::{self, BufRead};

use thiserror::Error;
use tracing::{debug, warn};

use super::{DecodeError, PullEvent, PullUpdate, decode_line};
use crate::console::{Icon, LineSink};

/// Why a pull did not finish cleanly.
#[derive(Debug, Error)]
pub enum PullError {
    /// Error event sent by the engine. Always terminal.
    #[error("{0}")]
    Engine(String),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("unable to handle line: {0}")]
    Unhandled(String),
    #[error("failed to read pull output: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write pull progress: {0}")]
    Render(#[source] io::Error),
}

/// Whether the renderer wants more lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Identifier → number of lines printed below that identifier's line.
///
/// Entries are only ever added during one pull; offsets only grow.
#[derive(Debug, Default)]
pub struct LinePositions {
    offsets: HashMap<String, usize>,
}

impl LinePositions {
    pub fn get(&self, id: &str) -> Option<usize> {
        self.offsets.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// A new line went out below every tracked line.
    fn advance(&mut self) {
        for offset in self.offsets.values_mut() {
            *offset += 1;
        }
    }

    /// A new line for `id` went out; it becomes the bottom line.
    fn track(&mut self, id: &str) {
        self.advance();
        self.offsets.insert(id.to_string(), 0);
    }
}

/// Turns a pull-output stream into per-layer lines that update in place.
pub struct ProgressRenderer<'a, S: LineSink + ?Sized> {
    sink: &'a mut S,
    positions: LinePositions,
    pending: Option<PullError>,
}

impl<'a, S: LineSink + ?Sized> ProgressRenderer<'a, S> {
    pub fn new(sink: &'a mut S) -> Self {
        Self {
            sink,
            positions: LinePositions::default(),
            pending: None,
        }
    }

    pub fn positions(&self) -> &LinePositions {
        &self.positions
    }

    /// Consume `reader` line by line until it ends or an error event arrives.
    ///
    /// Returns the last failure seen; an engine error event always ends the
    /// stream and is therefore always the one reported.
    pub fn render<R: BufRead>(mut self, reader: R) -> Result<(), PullError> {
        for chunk in reader.split(b'\n') {
            let chunk = chunk.map_err(PullError::Read)?;
            let line = String::from_utf8_lossy(&chunk);
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if self.feed(line)? == Flow::Stop {
                break;
            }
        }
        self.finish()
    }

    /// Handle one raw line. `Err` only when writing to the sink fails.
    pub fn feed(&mut self, line: &str) -> Result<Flow, PullError> {
        let event = match decode_line(line) {
            Ok(event) => event,
            Err(err) => {
                warn!(line, error = %err.source, "undecodable pull output line");
                self.new_line(Icon::Error, &err.to_string())?;
                self.pending = Some(PullError::Decode(err));
                return Ok(Flow::Continue);
            }
        };

        match event {
            PullEvent::Error(message) => {
                self.sink
                    .print_line(Icon::Error, &message)
                    .map_err(PullError::Render)?;
                self.pending = Some(PullError::Engine(message));
                Ok(Flow::Stop)
            }
            PullEvent::Update(update) => {
                self.apply(&update, line)?;
                Ok(Flow::Continue)
            }
        }
    }

    /// End of stream: report the pending failure, if any.
    pub fn finish(self) -> Result<(), PullError> {
        match self.pending {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn apply(&mut self, update: &PullUpdate, raw: &str) -> Result<(), PullError> {
        if update.has_status() {
            let status = update.status_text();
            let id = &update.id;

            if let Some(progress) = &update.progress {
                let offset = self.positions.get(id).unwrap_or(0);
                return self.rewrite(offset, &format!("{status} :: {id} :: {progress}"));
            }

            if update.has_progress_detail && update.has_id() {
                let text = format!("{status} :: {id}");
                return match self.positions.get(id) {
                    Some(offset) => self.rewrite(offset, &text),
                    None => {
                        self.sink
                            .print_line(Icon::Docker, &text)
                            .map_err(PullError::Render)?;
                        self.positions.track(id);
                        debug!(id = %id, tracked = self.positions.len(), "tracking layer");
                        Ok(())
                    }
                };
            }

            if update.has_id() {
                return self.new_line(Icon::Docker, &format!("{status} :: {id}"));
            }
            return self.new_line(Icon::Docker, status);
        }

        if let Some(stream) = &update.stream {
            return self.new_line(Icon::Docker, stream.trim_end());
        }

        let err = PullError::Unhandled(raw.to_string());
        self.new_line(Icon::Error, &err.to_string())?;
        self.pending = Some(err);
        Ok(())
    }

    fn new_line(&mut self, icon: Icon, text: &str) -> Result<(), PullError> {
        self.sink
            .print_line(icon, text)
            .map_err(PullError::Render)?;
        self.positions.advance();
        Ok(())
    }

    fn rewrite(&mut self, offset: usize, text: &str) -> Result<(), PullError> {
        self.sink
            .rewrite_line(offset, Icon::Docker, text)
            .map_err(PullError::Render)
    }
}
