//! Server-Sent Events (SSE) parser for chat-completion streaming responses.
//!
//! This module provides an SSE parser that handles:
//! - Frames split across TCP chunks
//! - Multiple frames in one read
//! - Comments, `event:` lines and payloads without text (ignored)
//!
//! Text comes from `choices[0].delta.content`. `data: [DONE]` ends the
//! stream and an `error` payload fails it.

use serde_json::Value;
use tracing::debug;

use super::{Frame, FrameParser};

/// Stateful SSE parser that buffers incomplete frames across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
}

impl SseParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Feeds a chunk of data to the parser and returns all complete frames.
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);
        let mut frames = Vec::new();

        while let Some((event_end, boundary_len)) = self.find_event_boundary() {
            let rest = self.buffer.split_off(event_end + boundary_len);
            let event_text = std::mem::replace(&mut self.buffer, rest);

            if let Some(frame) = Self::parse_event(&event_text[..event_end]) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Parses a final event that was not followed by a blank line.
    pub fn finish(&mut self) -> Vec<Frame> {
        let rest = std::mem::take(&mut self.buffer);
        Self::parse_event(&rest).into_iter().collect()
    }

    /// Finds the earliest blank-line boundary, `\n\n` or `\r\n\r\n`.
    fn find_event_boundary(&self) -> Option<(usize, usize)> {
        let lf = self.buffer.find("\n\n").map(|pos| (pos, 2));
        let crlf = self.buffer.find("\r\n\r\n").map(|pos| (pos, 4));
        match (lf, crlf) {
            (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
            (a, b) => a.or(b),
        }
    }

    fn parse_event(event_text: &str) -> Option<Frame> {
        let mut data_lines: Vec<&str> = Vec::new();

        for line in event_text.lines() {
            let line = line.trim();

            if line.is_empty() || line.starts_with(':') {
                continue;
            }

            if let Some(data) = line.strip_prefix("data:") {
                let data = data.trim();
                if !data.is_empty() {
                    data_lines.push(data);
                }
            }
        }

        if data_lines.is_empty() {
            return None;
        }

        let data = data_lines.join("\n");

        if data == "[DONE]" {
            return Some(Frame::Done);
        }

        Self::parse_json_event(&data)
    }

    fn parse_json_event(data: &str) -> Option<Frame> {
        let json: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, "Skipping malformed SSE data payload");
                return None;
            }
        };

        if let Some(error) = json.get("error") {
            return Some(Frame::Failed(extract_error_message(error)));
        }

        json.pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| Frame::Text(s.to_string()))
    }

    #[must_use]
    pub fn remaining_buffer(&self) -> &str {
        &self.buffer
    }
}

impl FrameParser for SseParser {
    fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        SseParser::feed(self, chunk)
    }

    fn finish(&mut self) -> Vec<Frame> {
        SseParser::finish(self)
    }
}

fn extract_error_message(error: &Value) -> String {
    if let Some(msg) = error.get("message").and_then(Value::as_str) {
        return msg.to_string();
    }
    if let Some(msg) = error.as_str() {
        return msg.to_string();
    }
    "Unknown error".to_string()
}
