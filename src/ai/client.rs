//! Upstream model clients.
//!
//! Both providers sit behind [`UpstreamClient`]: open a streaming call for a
//! prompt and get back a lazy, finite, non-restartable sequence of text
//! fragments. Only the adapters know about the wire format.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{error, info};
use url::Url;

use super::ndjson::NdjsonParser;
use super::sse::SseParser;
use super::stream::{ByteStream, FrameStream};
use crate::core::config::{AppConfig, UpstreamProvider};
use crate::errors::SummarizeError;

/// Text fragments in upstream arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, SummarizeError>> + Send>>;

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Human-readable backend name used in operator-facing error messages.
    fn backend_name(&self) -> &str;

    /// Opens a streaming completion for `prompt`.
    ///
    /// # Errors
    ///
    /// `Configuration` when a required setting is missing, and
    /// `UpstreamUnavailable` when the call cannot be established or returns a
    /// non-success status. Nothing is streamed in either case.
    async fn open_stream(&self, prompt: &str) -> Result<TextStream, SummarizeError>;
}

/// Builds the upstream selected by `config.provider`.
pub fn build_upstream(config: &AppConfig) -> Result<Arc<dyn UpstreamClient>, SummarizeError> {
    let http = Client::builder()
        .connect_timeout(config.connect_timeout)
        .build()
        .map_err(|e| SummarizeError::Configuration(format!("Failed to build HTTP client: {e}")))?;

    let upstream: Arc<dyn UpstreamClient> = match config.provider {
        UpstreamProvider::Ollama => Arc::new(OllamaClient::new(
            http,
            config.ollama_url.clone(),
            config.ollama_model.clone(),
            config.temperature,
        )),
        UpstreamProvider::OpenAi => Arc::new(OpenAiClient::new(
            http,
            config.openai_base_url.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.temperature,
            config.max_tokens,
        )),
    };
    Ok(upstream)
}

/// Joins `path` onto `base` without dropping a base path segment.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, SummarizeError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    base.join(path.trim_start_matches('/'))
        .map_err(|e| SummarizeError::Configuration(format!("Invalid base URL {base}: {e}")))
}

fn into_byte_stream(response: reqwest::Response) -> ByteStream {
    Box::pin(response.bytes_stream().map(|chunk| {
        chunk.map_err(|e| SummarizeError::Stream(format!("Error reading upstream response: {e}")))
    }))
}

/// Sends the request and turns any failure to establish it into
/// `UpstreamUnavailable`.
async fn send_streaming_request(
    backend: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, SummarizeError> {
    let response = request.send().await.map_err(|e| {
        error!(backend, error = %e, "Upstream streaming request failed");
        SummarizeError::UpstreamUnavailable {
            backend: backend.to_string(),
            detail: e.to_string(),
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_else(|e| {
            format!("Failed to read error response body (status {status}): {e}")
        });
        error!(backend, %status, body = %error_text, "Upstream returned an error status");
        return Err(SummarizeError::UpstreamUnavailable {
            backend: backend.to_string(),
            detail: format!("status {status}: {error_text}"),
        });
    }

    Ok(response)
}

/// Local model server speaking newline-delimited JSON (`/api/generate`).
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: Client,
    base_url: Url,
    model: String,
    temperature: f32,
}

impl OllamaClient {
    #[must_use]
    pub fn new(http: Client, base_url: Url, model: String, temperature: f32) -> Self {
        Self {
            http,
            base_url,
            model,
            temperature,
        }
    }

    #[must_use]
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "prompt": prompt,
            "stream": true,
            "temperature": self.temperature,
        })
    }
}

#[async_trait]
impl UpstreamClient for OllamaClient {
    fn backend_name(&self) -> &str {
        "Ollama"
    }

    async fn open_stream(&self, prompt: &str) -> Result<TextStream, SummarizeError> {
        let url = endpoint(&self.base_url, "api/generate")?;
        info!(model = %self.model, %url, prompt_len = prompt.len(), "Opening Ollama stream");

        let request = self.http.post(url).json(&self.request_body(prompt));
        let response = send_streaming_request(self.backend_name(), request).await?;

        Ok(FrameStream::new(into_byte_stream(response), NdjsonParser::new()).into_text_stream())
    }
}

/// Hosted chat-completions API streaming Server-Sent Events.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(
        http: Client,
        base_url: Url,
        api_key: Option<String>,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }

    /// The composed prompt goes out as a single user message.
    #[must_use]
    pub fn build_messages(prompt: &str) -> Vec<ChatCompletionMessage> {
        vec![ChatCompletionMessage {
            role: MessageRole::user,
            content: Content::Text(prompt.to_string()),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }]
    }

    #[must_use]
    pub fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "messages": chat_messages_json(&Self::build_messages(prompt)),
            "stream": true,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

#[async_trait]
impl UpstreamClient for OpenAiClient {
    fn backend_name(&self) -> &str {
        "the hosted model API"
    }

    async fn open_stream(&self, prompt: &str) -> Result<TextStream, SummarizeError> {
        let Some(api_key) = self.api_key.as_deref() else {
            error!("OPENAI_API_KEY is not configured");
            return Err(SummarizeError::Configuration(
                "OPENAI_API_KEY is not set".to_string(),
            ));
        };

        let url = endpoint(&self.base_url, "chat/completions")?;
        info!(
            model = %self.model,
            %url,
            prompt_len = prompt.len(),
            "Opening chat completion stream"
        );

        let request = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&self.request_body(prompt));
        let response = send_streaming_request(self.backend_name(), request).await?;

        Ok(FrameStream::new(into_byte_stream(response), SseParser::new()).into_text_stream())
    }
}

/// Chat-completions `messages` payload for a prompt.
pub(crate) fn chat_messages_json(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role = match m.role {
                MessageRole::system => "system",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
                MessageRole::assistant => "assistant",
            };
            match &m.content {
                Content::Text(text) => Some(json!({ "role": role, "content": text })),
                // Summaries are text-only.
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}
