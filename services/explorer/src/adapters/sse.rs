//! services/explorer/src/adapters/sse.rs
//!
//! Decodes the server-sent event stream of a report generation response into
//! `GenerationEvent`s.
//!
//! The decoder works line by line: `data:` fields accumulate until a blank line
//! dispatches the event, comment lines and other fields are ignored. A spawned
//! pump task feeds decoded events into a channel that backs the returned stream.

use explorer_core::ports::{GenerationStream, PortError, PortResult};
use explorer_core::GenerationEvent;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

/// Upper bound for buffered, not yet dispatched event data.
const MAX_SSE_BUFFER_BYTES: usize = 4 * 1024 * 1024;
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, PartialEq)]
pub(crate) enum SseFrame {
    Event(GenerationEvent),
    Done,
}

/// Incremental SSE decoder. Feed it raw chunks, get complete frames back.
#[derive(Debug, Default)]
pub(crate) struct SseDecoder {
    /// Bytes of the current, unterminated line.
    line: Vec<u8>,
    /// `data:` values of the event being assembled.
    data: Vec<String>,
    data_bytes: usize,
    done: bool,
}

impl SseDecoder {
    pub(crate) fn push(&mut self, chunk: &[u8]) -> PortResult<Vec<SseFrame>> {
        let mut frames = Vec::new();
        if self.done {
            return Ok(frames);
        }
        self.line.extend_from_slice(chunk);

        while let Some(end) = self.line.iter().position(|byte| *byte == b'\n') {
            let raw: Vec<u8> = self.line.drain(..=end).collect();
            let line = line_text(&raw[..end])?;
            if let Some(frame) = self.feed_line(line)? {
                frames.push(frame);
                if self.done {
                    self.line.clear();
                    break;
                }
            }
        }

        if self.line.len() + self.data_bytes > MAX_SSE_BUFFER_BYTES {
            return Err(PortError::Unexpected(
                "Report stream buffer exceeded maximum size (4 MiB)".to_string(),
            ));
        }
        Ok(frames)
    }

    /// Dispatches whatever is left once the body ended without a final blank line.
    pub(crate) fn finish(&mut self) -> PortResult<Vec<SseFrame>> {
        if self.done {
            return Ok(Vec::new());
        }
        let rest = std::mem::take(&mut self.line);
        let mut frames = Vec::new();
        if !rest.is_empty() {
            let line = line_text(&rest)?;
            frames.extend(self.feed_line(line)?);
        }
        frames.extend(self.feed_line("")?);
        Ok(frames)
    }

    fn feed_line(&mut self, line: &str) -> PortResult<Option<SseFrame>> {
        if line.is_empty() {
            return Ok(self.dispatch());
        }
        if line.starts_with(':') {
            return Ok(None);
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data_bytes += value.len();
            self.data.push(value.to_string());
        }
        Ok(None)
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if self.data.is_empty() {
            return None;
        }
        let payload = self.data.join("\n");
        self.data.clear();
        self.data_bytes = 0;

        if payload.trim() == "[DONE]" {
            self.done = true;
            return Some(SseFrame::Done);
        }
        match serde_json::from_str::<GenerationEvent>(&payload) {
            Ok(event) => Some(SseFrame::Event(event)),
            Err(e) => {
                warn!(%e, payload_bytes = payload.len(), "Invalid report stream payload");
                None
            }
        }
    }
}

fn line_text(raw: &[u8]) -> PortResult<&str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).map_err(|_| {
        PortError::Unexpected("Received invalid UTF-8 from the report stream".to_string())
    })
}

/// Reads the response body until `[DONE]`, the end of the body or an error,
/// forwarding each event. Returns early once the receiving side is gone.
async fn pump_events(
    response: reqwest::Response,
    mut tx: mpsc::Sender<PortResult<GenerationEvent>>,
) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    loop {
        let next = body.next().await;
        let ended = next.is_none();
        let frames = match next {
            Some(Ok(chunk)) => decoder.push(&chunk),
            Some(Err(e)) => Err(PortError::Unexpected(e.to_string())),
            None => decoder.finish(),
        };
        let frames = match frames {
            Ok(frames) => frames,
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        };

        for frame in frames {
            let SseFrame::Event(event) = frame else {
                return;
            };
            if tx.send(Ok(event)).await.is_err() {
                debug!("Report stream receiver dropped");
                return;
            }
        }
        if ended {
            return;
        }
    }
}

/// Wraps a streaming response body as a `GenerationStream`.
pub(crate) fn generation_events(response: reqwest::Response) -> GenerationStream {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    tokio::spawn(pump_events(response, tx));
    Box::pin(rx)
}
