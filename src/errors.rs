use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::core::models::ErrorBody;

#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("{0}")]
    Validation(String),

    #[error("Server misconfiguration: {0}")]
    Configuration(String),

    #[error("Failed to summarize content. Make sure {backend} is running and reachable.")]
    UpstreamUnavailable { backend: String, detail: String },

    #[error("Summary stream failed: {0}")]
    Stream(String),

    #[error("Failed to generate summary")]
    RequestFailed { status: u16 },

    #[error("Failed to send HTTP request: {0}")]
    Http(String),
}

impl SummarizeError {
    /// HTTP status used when the error is reported before any body is sent.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_)
            | Self::UpstreamUnavailable { .. }
            | Self::Stream(_)
            | Self::RequestFailed { .. }
            | Self::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SummarizeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<reqwest::Error> for SummarizeError {
    fn from(error: reqwest::Error) -> Self {
        SummarizeError::Http(error.to_string())
    }
}

impl From<anyhow::Error> for SummarizeError {
    fn from(error: anyhow::Error) -> Self {
        SummarizeError::Configuration(error.to_string())
    }
}
