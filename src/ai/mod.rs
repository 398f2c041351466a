//! Upstream model access: wire parsers and the protocol adapters.

pub mod client;
pub mod ndjson;
pub mod sse;
pub mod stream;

pub use client::{OllamaClient, OpenAiClient, TextStream, UpstreamClient, build_upstream};
pub use stream::FrameStream;

/// One unit decoded from an upstream wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A non-empty text fragment to forward.
    Text(String),
    /// Explicit end-of-stream marker.
    Done,
    /// The provider reported an error inside the stream.
    Failed(String),
}

/// Incremental decoder for a text-based framing protocol.
pub trait FrameParser: Send {
    /// Appends decoded text and returns every frame completed by it.
    fn feed(&mut self, chunk: &str) -> Vec<Frame>;

    /// Called once at end of input to flush a trailing unterminated frame.
    fn finish(&mut self) -> Vec<Frame>;
}
