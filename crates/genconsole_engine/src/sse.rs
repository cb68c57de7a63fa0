//! Incremental `text/event-stream` frame decoder.
//!
//! Bytes are fed in arbitrary chunks; complete frames come out once their
//! terminating blank line has been seen. Lines are only decoded as UTF-8 once
//! complete, so multi-byte sequences split across chunks survive.
//!
//! A line longer than the decoder's limit is discarded together with the
//! frame it belongs to; decoding resumes at the next frame.

use bytes::{Buf, BytesMut};
use console_logging::console_warn;

/// Longest line kept in memory while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

#[derive(Debug)]
pub struct SseDecoder {
    buf: BytesMut,
    max_line: usize,
    skip_lf: bool,
    /// Inside an oversized line; bytes are dropped until its terminator.
    discarding_line: bool,
    /// The current frame lost a line; it is dropped at the next blank line.
    skip_frame: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    id: Option<String>,
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

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_line,
            skip_lf: false,
            discarding_line: false,
            skip_frame: false,
            data: String::new(),
            has_data: false,
            event: None,
            id: None,
        }
    }

    /// Feeds a chunk and returns every frame it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        loop {
            if self.skip_lf && !self.buf.is_empty() {
                if self.buf[0] == b'\n' {
                    self.buf.advance(1);
                }
                self.skip_lf = false;
            }
            let Some(pos) = self.buf.iter().position(|b| *b == b'\n' || *b == b'\r') else {
                if self.buf.len() > self.max_line {
                    self.drop_oversized_line();
                    self.buf.clear();
                    self.discarding_line = true;
                }
                break;
            };
            let line = self.buf.split_to(pos);
            let terminator = self.buf[0];
            self.buf.advance(1);
            if terminator == b'\r' {
                self.skip_lf = true;
            }

            if std::mem::take(&mut self.discarding_line) {
                continue;
            }
            if line.len() > self.max_line {
                self.drop_oversized_line();
                continue;
            }

            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Drops whatever partial frame is left when the stream ends.
    pub fn reset(&mut self) {
        *self = Self::with_max_line(self.max_line);
    }

    fn drop_oversized_line(&mut self) {
        console_warn!("Dropping stream frame with a line over {} bytes", self.max_line);
        self.skip_frame = true;
        self.data.clear();
        self.has_data = false;
        self.event = None;
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if self.skip_frame {
            if line.is_empty() {
                self.skip_frame = false;
            }
            return None;
        }
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
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(SseFrame {
            event,
            id: self.id.clone(),
            data: std::mem::take(&mut self.data),
        })
    }
}
