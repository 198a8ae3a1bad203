use std::io::{self, Read};

use bollard::errors::Error as BollardError;
use bollard::models::CreateImageInfo;
use futures_util::{Stream, StreamExt};
use serde_json::json;
use tokio::runtime::Runtime;

/// Blocking reader over the engine's pull progress stream.
///
/// Each progress record is handed out as one line of JSON, the same shape the
/// engine sends on the wire, so the pull can be consumed as plain NDJSON.
/// Records are fetched one at a time as the reader is drained.
pub struct PullReader<'a, S> {
    runtime: &'a Runtime,
    stream: S,
    line: Vec<u8>,
    pos: usize,
}

impl<'a, S> PullReader<'a, S>
where
    S: Stream<Item = Result<CreateImageInfo, BollardError>> + Unpin,
{
    pub fn new(runtime: &'a Runtime, stream: S) -> Self {
        Self {
            runtime,
            stream,
            line: Vec::new(),
            pos: 0,
        }
    }
}

impl<S> Read for PullReader<'_, S>
where
    S: Stream<Item = Result<CreateImageInfo, BollardError>> + Unpin,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.line.len() {
            match self.runtime.block_on(self.stream.next()) {
                Some(item) => {
                    self.line = encode(item)?;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }
        let n = (&self.line[self.pos..]).read(buf)?;
        self.pos += n;
        Ok(n)
    }
}

/// Engine-side failures become `{"error": ...}` lines so they end the pull the
/// same way an in-band error record does.
fn encode(item: Result<CreateImageInfo, BollardError>) -> io::Result<Vec<u8>> {
    let value = match item {
        Ok(info) => serde_json::to_value(&info)?,
        Err(BollardError::DockerStreamError { error }) => json!({ "error": error }),
        Err(BollardError::DockerResponseServerError { message, .. }) => json!({ "error": message }),
        Err(err) => return Err(io::Error::other(err)),
    };
    let mut line = serde_json::to_vec(&value)?;
    line.push(b'\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pull_output::{PullEvent, decode_line};
    use futures_util::stream;
    use std::io::{BufRead, BufReader};

    fn runtime() -> Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    fn info(status: &str, id: Option<&str>, progress: Option<&str>) -> CreateImageInfo {
        CreateImageInfo {
            status: Some(status.to_string()),
            id: id.map(str::to_string),
            progress: progress.map(str::to_string),
            ..Default::default()
        }
    }

    fn lines(items: Vec<Result<CreateImageInfo, BollardError>>) -> Vec<String> {
        let rt = runtime();
        let reader = PullReader::new(&rt, stream::iter(items));
        BufReader::with_capacity(7, reader)
            .lines()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn records_become_decodable_lines() {
        let out = lines(vec![
            Ok(info("Pulling from library/alpine", Some("3.19"), None)),
            Ok(info("Downloading", Some("4abcf2066143"), Some("[=>  ] 1MB/3MB"))),
        ]);
        assert_eq!(out.len(), 2);

        match decode_line(&out[1]).unwrap() {
            PullEvent::Update(u) => {
                assert_eq!(u.status, "Downloading");
                assert_eq!(u.id, "4abcf2066143");
                assert_eq!(u.progress.as_deref(), Some("[=>  ] 1MB/3MB"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stream_errors_become_error_lines() {
        let out = lines(vec![
            Ok(info("Pulling from library/nope", Some("latest"), None)),
            Err(BollardError::DockerStreamError {
                error: "manifest unknown".into(),
            }),
        ]);
        assert_eq!(
            decode_line(&out[1]).unwrap(),
            PullEvent::Error("manifest unknown".into())
        );
    }

    #[test]
    fn rejected_request_becomes_error_line() {
        let out = lines(vec![Err(BollardError::DockerResponseServerError {
            status_code: 404,
            message: "pull access denied for nope".into(),
        })]);
        assert_eq!(
            decode_line(&out[0]).unwrap(),
            PullEvent::Error("pull access denied for nope".into())
        );
    }

    #[test]
    fn empty_stream_reads_nothing() {
        assert!(lines(Vec::new()).is_empty());
    }
}
