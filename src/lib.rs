//! TLDR Stream - progressively rendered summaries from a streaming LLM backend.
//!
//! The crate has two halves joined by a plain-text HTTP stream:
//! 1. A relay (`api`) that validates a summary request, opens a streaming call
//!    to the upstream model (`ai`) and forwards clean text fragments as they
//!    arrive
//! 2. A consumer (`client`) that reads that stream incrementally and rebuilds
//!    the growing summary for display
//!
//! # Example
//!
//! ```no_run
//! use tldr_stream::client::{SummaryClient, SummarySession, TerminalView};
//! use tldr_stream::core::models::{SummaryLength, SummaryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = url::Url::parse("http://127.0.0.1:3000")?;
//!     let mut session = SummarySession::new(SummaryClient::new(&server)?);
//!     let mut view = TerminalView::new(std::io::stdout(), std::io::stderr());
//!
//!     let request = SummaryRequest::new("The quick brown fox jumps.", SummaryLength::Short);
//!     let summary = session.submit(&request, &mut view).await?;
//!     assert!(!summary.is_empty());
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod client;
pub mod core;
pub mod errors;
pub mod prompt;
pub mod utils;

/// Configure structured JSON logging for the relay server.
///
/// The level comes from `RUST_LOG` and defaults to `info`. Calling it more
/// than once is harmless; only the first call installs a subscriber.
///
/// # Example
///
/// ```
/// tldr_stream::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    // Ignored: a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Plain stderr logging for the terminal client, quiet unless `RUST_LOG` says
/// otherwise so stdout stays the summary.
pub fn setup_cli_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
