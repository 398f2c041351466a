use std::io::Write;

use super::consumer::SummaryView;
use super::state::RequestState;

/// Renders a summary progressively to a writer.
///
/// The accumulated summary only grows, so each update prints just the text
/// past what is already on screen. Errors go to a separate writer.
pub struct TerminalView<W: Write, E: Write> {
    out: W,
    err: E,
    printed: usize,
}

impl<W: Write, E: Write> TerminalView<W, E> {
    pub fn new(out: W, err: E) -> Self {
        Self {
            out,
            err,
            printed: 0,
        }
    }

    pub fn into_inner(self) -> (W, E) {
        (self.out, self.err)
    }

    fn print_new_text(&mut self, summary: &str) {
        if let Some(fresh) = summary.get(self.printed..) {
            // Nothing useful to do if the terminal is gone.
            let _ = self.out.write_all(fresh.as_bytes());
            let _ = self.out.flush();
            self.printed = summary.len();
        }
    }
}

impl<W: Write, E: Write> SummaryView for TerminalView<W, E> {
    fn render(&mut self, state: &RequestState) {
        match state {
            RequestState::Validating => self.printed = 0,
            RequestState::Streaming(summary) => self.print_new_text(summary.as_str()),
            RequestState::Complete(summary) => {
                self.print_new_text(summary.as_str());
                let _ = writeln!(self.out);
            }
            RequestState::Failed { message } => {
                if self.printed > 0 {
                    let _ = writeln!(self.out);
                }
                let _ = writeln!(self.err, "Error: {message}");
            }
            RequestState::Idle | RequestState::AwaitingUpstream => {}
        }
    }
}
