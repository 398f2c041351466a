//! Byte stream to text fragment adapter shared by both upstream protocols.

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::warn;

use super::client::TextStream;
use super::{Frame, FrameParser};
use crate::errors::SummarizeError;
use crate::utils::Utf8Decoder;

/// Raw upstream body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, SummarizeError>> + Send>>;

/// An open upstream response being decoded frame by frame.
pub struct FrameStream<P> {
    byte_stream: ByteStream,
    parser: P,
    decoder: Utf8Decoder,
    pending: VecDeque<Frame>,
    finished: bool,
}

impl<P> std::fmt::Debug for FrameStream<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("finished", &self.finished)
            .field("pending_len", &self.pending.len())
            .field("utf8_pending_len", &self.decoder.pending_len())
            .finish_non_exhaustive()
    }
}

impl<P: FrameParser + 'static> FrameStream<P> {
    #[must_use]
    pub fn new(byte_stream: ByteStream, parser: P) -> Self {
        Self {
            byte_stream,
            parser,
            decoder: Utf8Decoder::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Returns the next text fragment, or `None` once the upstream is done.
    ///
    /// # Errors
    ///
    /// Returns `SummarizeError::Stream` if reading the body fails or the
    /// provider reports an error frame.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, SummarizeError> {
        loop {
            // Drain everything already parsed; one read may complete several frames.
            while let Some(frame) = self.pending.pop_front() {
                match frame {
                    Frame::Text(text) => return Ok(Some(text)),
                    Frame::Done => {
                        self.finished = true;
                        self.pending.clear();
                        return Ok(None);
                    }
                    Frame::Failed(message) => {
                        self.finished = true;
                        self.pending.clear();
                        warn!(error = %message, "Upstream reported an error mid-stream");
                        return Err(SummarizeError::Stream(message));
                    }
                }
            }

            if self.finished {
                return Ok(None);
            }

            match self.byte_stream.next().await {
                Some(Ok(bytes)) => {
                    let text = self.decoder.decode(&bytes);
                    if !text.is_empty() {
                        self.pending.extend(self.parser.feed(&text));
                    }
                }
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.finished = true;
                    let tail = self.decoder.finish();
                    self.pending.extend(self.parser.feed(&tail));
                    self.pending.extend(self.parser.finish());
                }
            }
        }
    }

    /// Turns this response into a lazy, finite fragment stream.
    ///
    /// The stream ends after the first error.
    #[must_use]
    pub fn into_text_stream(self) -> TextStream {
        Box::pin(futures::stream::unfold(Some(self), |state| async move {
            let mut frames = state?;
            match frames.next_fragment().await {
                Ok(Some(text)) => Some((Ok(text), Some(frames))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        }))
    }
}
