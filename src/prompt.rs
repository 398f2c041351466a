//! Prompt templates and prompt composition for summary requests.

use crate::core::models::{SummaryLength, SummaryRequest};
use crate::errors::SummarizeError;

/// Message returned when the submitted content is empty or whitespace-only.
pub const CONTENT_REQUIRED: &str = "Content is required";

/// Fixed instruction table keyed by summary length.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptTemplate;

impl PromptTemplate {
    #[must_use]
    pub const fn instruction(length: SummaryLength) -> &'static str {
        match length {
            SummaryLength::Short => {
                "Summarize the following content in 2-3 sentences, capturing only the key points:"
            }
            SummaryLength::Medium => {
                "Summarize the following content in 4-5 sentences, covering the main ideas and important details:"
            }
            SummaryLength::Long => {
                "Summarize the following content in 8-10 sentences, including key points, supporting details, and conclusions:"
            }
        }
    }
}

/// Rejects blank content and returns the full upstream prompt.
///
/// The content is forwarded untrimmed; only the blank check trims.
pub fn build_prompt(request: &SummaryRequest) -> Result<String, SummarizeError> {
    if request.is_blank() {
        return Err(SummarizeError::Validation(CONTENT_REQUIRED.to_string()));
    }

    Ok(format!(
        "{}\n\n{}",
        PromptTemplate::instruction(request.length),
        request.content
    ))
}
