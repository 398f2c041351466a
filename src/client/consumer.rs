//! Stream Consumer: calls the relay and rebuilds the summary as bytes arrive.

use futures::StreamExt;
use reqwest::Client;
use tracing::{debug, info, warn};
use url::Url;

use super::state::{RequestEvent, RequestState};
use crate::ai::client::endpoint;
use crate::ai::stream::ByteStream;
use crate::api::handler::SUMMARIZE_PATH;
use crate::core::models::SummaryRequest;
use crate::errors::SummarizeError;
use crate::utils::Utf8Decoder;

pub const BLANK_INPUT_MESSAGE: &str = "Please provide some content to summarize";
pub const REQUEST_FAILED_MESSAGE: &str = "Failed to generate summary";
pub const STREAM_INTERRUPTED_MESSAGE: &str =
    "The summary stream was interrupted. Please try again.";

/// Receives every state the session passes through, including each
/// `Streaming` update.
pub trait SummaryView {
    fn render(&mut self, state: &RequestState);
}

/// HTTP client for the relay's summarize endpoint.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    http: Client,
    endpoint: Url,
}

impl SummaryClient {
    /// # Errors
    ///
    /// Returns `Configuration` if `base_url` cannot be joined with the
    /// summarize path.
    pub fn new(base_url: &Url) -> Result<Self, SummarizeError> {
        Self::with_client(Client::new(), base_url)
    }

    /// Like [`SummaryClient::new`] with a caller-supplied HTTP client.
    /// A path prefix on `base_url` is kept.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the joined URL is invalid.
    pub fn with_client(http: Client, base_url: &Url) -> Result<Self, SummarizeError> {
        let endpoint = endpoint(base_url, SUMMARIZE_PATH)?;
        Ok(Self { http, endpoint })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Issues the request and returns the response body as a text stream.
    ///
    /// # Errors
    ///
    /// `Http` if the relay cannot be reached, `RequestFailed` on a
    /// non-success status.
    pub async fn open(&self, request: &SummaryRequest) -> Result<SummaryStream, SummarizeError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Summarize request failed");
            return Err(SummarizeError::RequestFailed {
                status: status.as_u16(),
            });
        }

        Ok(SummaryStream::new(Box::pin(response.bytes_stream().map(
            |chunk| {
                chunk.map_err(|e| {
                    SummarizeError::Stream(format!("Error reading summary stream: {e}"))
                })
            },
        ))))
    }
}

/// Incremental reader over the relay's plain-text body.
pub struct SummaryStream {
    byte_stream: ByteStream,
    decoder: Utf8Decoder,
    done: bool,
}

impl std::fmt::Debug for SummaryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SummaryStream")
            .field("done", &self.done)
            .field("utf8_pending_len", &self.decoder.pending_len())
            .finish_non_exhaustive()
    }
}

impl SummaryStream {
    #[must_use]
    pub fn new(byte_stream: ByteStream) -> Self {
        Self {
            byte_stream,
            decoder: Utf8Decoder::new(),
            done: false,
        }
    }

    /// Returns the next decoded text, `None` when the body ends cleanly.
    ///
    /// Chunks that only contain part of a code point yield an empty string.
    ///
    /// # Errors
    ///
    /// `Stream` if the body terminates abnormally.
    pub async fn next_text(&mut self) -> Result<Option<String>, SummarizeError> {
        if self.done {
            return Ok(None);
        }

        match self.byte_stream.next().await {
            Some(Ok(bytes)) => Ok(Some(self.decoder.decode(&bytes))),
            Some(Err(e)) => {
                self.done = true;
                Err(e)
            }
            None => {
                self.done = true;
                let tail = self.decoder.finish();
                Ok((!tail.is_empty()).then_some(tail))
            }
        }
    }
}

/// One user's request lifecycle against a relay.
#[derive(Debug)]
pub struct SummarySession {
    client: SummaryClient,
    state: RequestState,
}

impl SummarySession {
    #[must_use]
    pub fn new(client: SummaryClient) -> Self {
        Self {
            client,
            state: RequestState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> &RequestState {
        &self.state
    }

    fn apply<V: SummaryView>(&mut self, event: RequestEvent, view: &mut V) {
        let state = std::mem::take(&mut self.state);
        self.state = state.transition(event);
        view.render(&self.state);
    }

    /// Runs one request to completion, publishing every state to `view`.
    ///
    /// Returns the complete summary. On failure the view has already been
    /// given a `Failed` state with a user-facing message and no partial text.
    ///
    /// Dropping the returned future abandons the read and closes the
    /// connection; the next call starts from a clean state.
    ///
    /// # Errors
    ///
    /// `Validation` for blank input (no network call), `Http` or
    /// `RequestFailed` if the relay refuses, `Stream` if the body breaks.
    pub async fn submit<V: SummaryView>(
        &mut self,
        request: &SummaryRequest,
        view: &mut V,
    ) -> Result<String, SummarizeError> {
        if self.state.is_in_flight() {
            warn!(state = self.state.name(), "Previous request was abandoned");
            self.apply(RequestEvent::Cancelled, view);
        }

        self.apply(RequestEvent::Submit, view);

        if request.is_blank() {
            self.apply(RequestEvent::Rejected(BLANK_INPUT_MESSAGE.to_string()), view);
            return Err(SummarizeError::Validation(BLANK_INPUT_MESSAGE.to_string()));
        }
        self.apply(RequestEvent::Accepted, view);

        let mut stream = match self.client.open(request).await {
            Ok(stream) => stream,
            Err(e) => {
                self.apply(RequestEvent::Failed(REQUEST_FAILED_MESSAGE.to_string()), view);
                return Err(e);
            }
        };
        self.apply(RequestEvent::ResponseStarted, view);

        loop {
            match stream.next_text().await {
                Ok(Some(text)) if text.is_empty() => {}
                Ok(Some(text)) => {
                    debug!(bytes = text.len(), "Received summary chunk");
                    self.apply(RequestEvent::Chunk(text), view);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "Summary stream failed");
                    self.apply(
                        RequestEvent::Failed(STREAM_INTERRUPTED_MESSAGE.to_string()),
                        view,
                    );
                    return Err(e);
                }
            }
        }

        self.apply(RequestEvent::Finished, view);
        let summary = self.state.visible_summary().unwrap_or_default().to_string();
        info!(summary_len = summary.len(), "Summary complete");
        Ok(summary)
    }
}
