//! Server-sent event decoding.
//!
//! [`SseDecoder`] turns arbitrary byte chunks into complete events:
//! `data:` lines accumulate, a blank line dispatches, `:` lines are
//! comments. [`SseStream`] drives the decoder over a live response body.
//!
//! An unterminated line that outgrows the decoder's limit (1 MiB by
//! default) is a stream error.

use std::collections::VecDeque;

use bytes::{Buf, Bytes, BytesMut};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;

use crate::error::Error;

/// Longest line the decoder buffers while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if the server named the event.
    pub event: Option<String>,
    /// All `data:` lines of the event, joined with `\n`.
    pub data: String,
    /// Value of the last `id:` field seen for this event.
    pub id: Option<String>,
    /// Reconnection hint from a `retry:` field, in milliseconds.
    pub retry: Option<u64>,
}

/// Incremental line-oriented SSE decoder.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: BytesMut,
    pending: SseEvent,
    data_lines: Vec<String>,
    max_line: usize,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that rejects lines longer than `max_line` bytes.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            pending: SseEvent::default(),
            data_lines: Vec::new(),
            max_line,
        }
    }

    /// Feed a chunk of bytes, returning every event it completed.
    ///
    /// Fails with [`Error::Stream`] once an unterminated line exceeds the
    /// limit; the partial event is discarded.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, Error> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            let line = String::from_utf8_lossy(&line).into_owned();
            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        if self.buffer.len() > self.max_line {
            self.buffer.clear();
            self.pending = SseEvent::default();
            self.data_lines.clear();
            return Err(Error::Stream(format!(
                "event line exceeds {} bytes",
                self.max_line
            )));
        }
        Ok(events)
    }

    /// Flush a trailing unterminated line and any event still pending.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.buffer.has_remaining() {
            let rest = self.buffer.split();
            let line = String::from_utf8_lossy(&rest);
            let line = line.trim_end_matches('\r').to_owned();
            if let Some(event) = self.process_line(&line) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data_lines.push(value.to_owned()),
            "event" => self.pending.event = Some(value.to_owned()),
            "id" => self.pending.id = Some(value.to_owned()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.pending.retry = Some(ms);
                }
            }
            other => tracing::trace!(field = other, "ignoring unknown SSE field"),
        }
        None
    }

    /// Complete the pending event. Events without data are discarded.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let mut event = std::mem::take(&mut self.pending);
        if self.data_lines.is_empty() {
            return None;
        }
        event.data = std::mem::take(&mut self.data_lines).join("\n");
        Some(event)
    }
}

/// A live SSE response body.
pub struct SseStream {
    body: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    ready: VecDeque<SseEvent>,
    finished: bool,
}

impl SseStream {
    pub(crate) fn from_response(resp: reqwest::Response) -> Self {
        Self {
            body: resp.bytes_stream().boxed(),
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    /// Wait for the next complete event.
    ///
    /// Returns `None` once the server closes the body; a transport
    /// failure mid-read is returned once, after which the stream is done.
    pub async fn next_event(&mut self) -> Option<Result<SseEvent, Error>> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(chunk)) => match self.decoder.feed(&chunk) {
                    Ok(events) => self.ready.extend(events),
                    Err(e) => {
                        self.finished = true;
                        return Some(Err(e));
                    }
                },
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(Error::Stream(e.to_string())));
                }
                None => {
                    self.finished = true;
                    self.ready.extend(self.decoder.finish());
                }
            }
        }
    }
}
