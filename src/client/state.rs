//! Client-side request lifecycle.
//!
//! `Idle → Validating → AwaitingUpstream → Streaming → {Complete | Failed}`,
//! driven through [`RequestState::transition`] only.

use tracing::warn;

/// Summary text received so far. Only ever appended to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccumulatedSummary {
    text: String,
}

impl AccumulatedSummary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Validating,
    AwaitingUpstream,
    Streaming(AccumulatedSummary),
    Complete(AccumulatedSummary),
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestEvent {
    Submit,
    Accepted,
    Rejected(String),
    ResponseStarted,
    Chunk(String),
    Finished,
    Failed(String),
    /// The in-flight request was abandoned by the caller.
    Cancelled,
}

impl RequestState {
    /// Applies `event`. Events that make no sense in the current state are
    /// logged and leave the state unchanged.
    #[must_use]
    pub fn transition(self, event: RequestEvent) -> Self {
        match (self, event) {
            (Self::Idle | Self::Complete(_) | Self::Failed { .. }, RequestEvent::Submit) => {
                Self::Validating
            }
            (Self::Validating, RequestEvent::Accepted) => Self::AwaitingUpstream,
            (Self::Validating, RequestEvent::Rejected(message)) => Self::Failed { message },
            (Self::AwaitingUpstream, RequestEvent::ResponseStarted) => {
                Self::Streaming(AccumulatedSummary::new())
            }
            (Self::Streaming(mut summary), RequestEvent::Chunk(text)) => {
                summary.push(&text);
                Self::Streaming(summary)
            }
            (Self::Streaming(summary), RequestEvent::Finished) => Self::Complete(summary),
            // Partial output is discarded in favour of the error.
            (Self::AwaitingUpstream | Self::Streaming(_), RequestEvent::Failed(message)) => {
                Self::Failed { message }
            }
            (state, RequestEvent::Cancelled) if state.is_in_flight() => Self::Idle,
            (state, event) => {
                warn!(state = state.name(), ?event, "Ignoring invalid request state transition");
                state
            }
        }
    }

    /// True while a request is active; the UI must not allow re-submission.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Validating | Self::AwaitingUpstream | Self::Streaming(_)
        )
    }

    /// The summary to display, if any.
    #[must_use]
    pub fn visible_summary(&self) -> Option<&str> {
        match self {
            Self::Streaming(summary) | Self::Complete(summary) => Some(summary.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message } => Some(message),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::AwaitingUpstream => "awaiting_upstream",
            Self::Streaming(_) => "streaming",
            Self::Complete(_) => "complete",
            Self::Failed { .. } => "failed",
        }
    }
}
