//! Forwards upstream text fragments into the HTTP response body.
//!
//! A spawned task pulls fragments and pushes them through a bounded channel
//! that backs the body. The task owns the upstream stream, so the upstream
//! connection is dropped on every exit path: completion, upstream error, or
//! the caller going away (the body, and with it the receiver, is dropped).

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Instrument, debug, error, info};

use crate::ai::TextStream;
use crate::errors::SummarizeError;

/// Fragments buffered between the upstream reader and the body writer.
pub const RELAY_CHANNEL_CAPACITY: usize = 32;

type BodyChunk = Result<Bytes, SummarizeError>;

/// How a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Completed { fragments: usize },
    Failed { fragments: usize },
    CallerGone { fragments: usize },
}

/// Spawns the forwarder and returns the body it feeds.
pub fn relay_body(fragments: TextStream) -> Body {
    let (tx, rx) = mpsc::channel::<BodyChunk>(RELAY_CHANNEL_CAPACITY);
    tokio::spawn(
        async move {
            match forward(fragments, tx).await {
                RelayOutcome::Completed { fragments } => {
                    info!(fragments, "Upstream stream completed");
                }
                RelayOutcome::CallerGone { fragments } => {
                    info!(fragments, "Caller disconnected; released upstream stream");
                }
                RelayOutcome::Failed { fragments } => {
                    debug!(fragments, "Relay ended after an upstream error");
                }
            }
        }
        .in_current_span(),
    );
    Body::from_stream(ReceiverStream::new(rx))
}

/// Pulls fragments in order and sends them as raw text bytes.
///
/// A mid-stream upstream error is sent into the channel so the body ends
/// abnormally instead of looking like a clean, shorter summary.
pub async fn forward(mut fragments: TextStream, tx: mpsc::Sender<BodyChunk>) -> RelayOutcome {
    let mut forwarded = 0;

    loop {
        let next = tokio::select! {
            biased;
            () = tx.closed() => return RelayOutcome::CallerGone { fragments: forwarded },
            next = fragments.next() => next,
        };

        match next {
            Some(Ok(text)) => {
                if tx.send(Ok(Bytes::from(text))).await.is_err() {
                    return RelayOutcome::CallerGone { fragments: forwarded };
                }
                forwarded += 1;
                debug!(fragments = forwarded, "Forwarded fragment");
            }
            Some(Err(e)) => {
                error!(error = %e, fragments = forwarded, "Upstream stream failed mid-response");
                // Ignored: the caller may already be gone.
                let _ = tx.send(Err(e)).await;
                return RelayOutcome::Failed { fragments: forwarded };
            }
            None => return RelayOutcome::Completed { fragments: forwarded },
        }
    }
}
