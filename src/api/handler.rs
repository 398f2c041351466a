//! HTTP surface of the relay.
//!
//! This module handles:
//! - Request parsing and content validation (400 before any upstream call)
//! - Opening the upstream stream (500 with a JSON envelope if that fails)
//! - Handing the fragment stream to the relay as a `text/plain` body

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tracing::{info, warn};
use uuid::Uuid;

use super::relay::relay_body;
use crate::ai::UpstreamClient;
use crate::core::models::SummaryRequest;
use crate::errors::SummarizeError;
use crate::prompt::build_prompt;

pub const SUMMARIZE_PATH: &str = "/api/summarize";
pub const HEALTH_PATH: &str = "/health";
pub const INVALID_BODY: &str = "Invalid request body";

/// Shared, immutable handler state.
#[derive(Clone)]
pub struct AppState {
    upstream: Arc<dyn UpstreamClient>,
}

impl AppState {
    #[must_use]
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self { upstream }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(SUMMARIZE_PATH, post(summarize))
        .route(HEALTH_PATH, get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "Ok"
}

/// `POST /api/summarize`: streams the summary as plain text.
///
/// # Errors
///
/// Pre-stream failures are returned as `{"error": ...}` with 400 or 500.
/// Failures after the body has started end the body abnormally instead.
#[tracing::instrument(level = "info", skip_all, fields(correlation_id = %Uuid::new_v4()))]
pub async fn summarize(
    State(state): State<AppState>,
    payload: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<Response, SummarizeError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection, "Rejected summarize request body");
        SummarizeError::Validation(INVALID_BODY.to_string())
    })?;

    let prompt = build_prompt(&request).inspect_err(|_| {
        warn!("Rejected blank summarize request");
    })?;

    #[cfg(feature = "debug-logs")]
    info!("Using summary prompt:\n{}", prompt);

    #[cfg(not(feature = "debug-logs"))]
    info!(
        length = request.length.as_str(),
        prompt_len = prompt.len(),
        "Summarize request accepted"
    );

    let fragments = state.upstream.open_stream(&prompt).await?;

    let mut response = relay_body(fragments).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}
