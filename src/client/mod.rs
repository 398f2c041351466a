//! Stream Consumer side: request lifecycle, relay client and rendering.

pub mod consumer;
pub mod state;
pub mod view;

pub use consumer::{SummaryClient, SummarySession, SummaryStream, SummaryView};
pub use state::{AccumulatedSummary, RequestEvent, RequestState};
pub use view::TerminalView;
