//! Newline-delimited JSON parser for local-model (Ollama-style) streaming.
//!
//! Each line is an independent JSON object that may carry a `response` text
//! fragment. Lines can be split across reads and several can arrive in one
//! read; the trailing partial line is kept until its newline shows up.
//! Lines that do not parse are dropped without ending the stream. A line with
//! a top-level `error` string fails it.

use serde_json::Value;
use tracing::debug;

use super::{Frame, FrameParser};

/// Stateful NDJSON parser that buffers the incomplete trailing line.
#[derive(Debug, Default)]
pub struct NdjsonParser {
    buffer: String,
}

impl NdjsonParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
        }
    }

    /// Appends decoded text and returns frames for every completed line.
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        self.buffer.push_str(chunk);

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);

        complete.split('\n').filter_map(Self::parse_line).collect()
    }

    /// Gives whatever is left in the buffer one last parse attempt.
    pub fn finish(&mut self) -> Vec<Frame> {
        let rest = std::mem::take(&mut self.buffer);
        Self::parse_line(&rest).into_iter().collect()
    }

    fn parse_line(line: &str) -> Option<Frame> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let json: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                debug!(error = %e, line_len = line.len(), "Skipping malformed NDJSON line");
                return None;
            }
        };

        if let Some(message) = json.get("error").and_then(Value::as_str) {
            return Some(Frame::Failed(message.to_string()));
        }

        json.get("response")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(|s| Frame::Text(s.to_string()))
    }

    #[must_use]
    pub fn remaining_buffer(&self) -> &str {
        &self.buffer
    }
}

impl FrameParser for NdjsonParser {
    fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        NdjsonParser::feed(self, chunk)
    }

    fn finish(&mut self) -> Vec<Frame> {
        NdjsonParser::finish(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(frames: Vec<Frame>) -> Vec<String> {
        frames
            .into_iter()
            .filter_map(|f| match f {
                Frame::Text(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    fn parse_in_chunks(input: &[u8], boundaries: &[usize]) -> Vec<String> {
        let mut parser = NdjsonParser::new();
        let mut decoder = crate::utils::Utf8Decoder::new();
        let mut out = Vec::new();
        let mut start = 0;
        for &end in boundaries.iter().chain(std::iter::once(&input.len())) {
            out.extend(texts(parser.feed(&decoder.decode(&input[start..end]))));
            start = end;
        }
        out.extend(texts(parser.feed(&decoder.finish())));
        out.extend(texts(parser.finish()));
        out
    }

    #[test]
    fn test_parse_single_line() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed("{\"response\":\"A fox\"}\n");
        assert_eq!(frames, vec![Frame::Text("A fox".to_string())]);
        assert!(parser.remaining_buffer().is_empty());
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed("{\"response\":\"A fox\"}\n{\"response\":\" jumps.\"}\n");
        assert_eq!(texts(frames), vec!["A fox", " jumps."]);
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut parser = NdjsonParser::new();
        assert!(parser.feed("{\"respon").is_empty());
        assert_eq!(parser.remaining_buffer(), "{\"respon");

        let frames = parser.feed("se\":\"Hello\"}\n{\"resp");
        assert_eq!(texts(frames), vec!["Hello"]);
        assert_eq!(parser.remaining_buffer(), "{\"resp");
    }

    #[test]
    fn test_same_fragments_for_every_split_point() {
        let input = concat!(
            "{\"model\":\"qwen2:7b\",\"response\":\"Le \",\"done\":false}\n",
            "{\"response\":\"résumé \"}\n",
            "{\"response\":\"世界\"}\n",
            "{\"response\":\"\",\"done\":true}\n"
        )
        .as_bytes();
        let expected = vec!["Le ", "résumé ", "世界"];

        for split in 0..=input.len() {
            assert_eq!(parse_in_chunks(input, &[split]), expected, "split at {split}");
        }
        for a in (0..input.len()).step_by(7) {
            for b in (a..input.len()).step_by(11) {
                assert_eq!(parse_in_chunks(input, &[a, b]), expected, "splits at {a},{b}");
            }
        }

        let every_byte: Vec<usize> = (1..input.len()).collect();
        assert_eq!(parse_in_chunks(input, &every_byte), expected);
    }

    #[test]
    fn test_malformed_line_is_skipped() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed(concat!(
            "{\"response\":\"one\"}\n",
            "{not json at all\n",
            "{\"response\":\"two\"}\n",
            "]]]\n",
            "{\"response\":\"three\"}\n"
        ));
        assert_eq!(texts(frames), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_objects_without_text_are_ignored() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed(concat!(
            "{\"done\":true,\"total_duration\":123}\n",
            "{\"response\":\"\"}\n",
            "{\"response\":42}\n",
            "\"just a string\"\n",
            "\n",
            "   \n"
        ));
        assert!(frames.is_empty());
    }

    #[test]
    fn test_finish_parses_unterminated_last_line() {
        let mut parser = NdjsonParser::new();
        assert_eq!(texts(parser.feed("{\"response\":\"a\"}\n{\"response\":\"b\"}")), vec!["a"]);
        assert_eq!(texts(parser.finish()), vec!["b"]);
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_finish_drops_truncated_last_line() {
        let mut parser = NdjsonParser::new();
        parser.feed("{\"response\":\"a\"}\n{\"response\":\"tru");
        assert!(parser.finish().is_empty());
    }

    #[test]
    fn test_crlf_line_endings() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed("{\"response\":\"win\"}\r\n{\"response\":\"dows\"}\r\n");
        assert_eq!(texts(frames), vec!["win", "dows"]);
    }

    #[test]
    fn test_escaped_newlines_inside_fragment() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed("{\"response\":\"Line1\\nLine2\"}\n");
        assert_eq!(texts(frames), vec!["Line1\nLine2"]);
    }

    #[test]
    fn test_error_line_fails_stream() {
        let mut parser = NdjsonParser::new();
        let frames = parser.feed("{\"response\":\"partial\"}\n{\"error\":\"model crashed\"}\n");
        assert_eq!(
            frames,
            vec![
                Frame::Text("partial".to_string()),
                Frame::Failed("model crashed".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_string_error_field_is_ignored() {
        let mut parser = NdjsonParser::new();
        assert!(parser.feed("{\"error\":null,\"done\":false}\n").is_empty());
    }
}
