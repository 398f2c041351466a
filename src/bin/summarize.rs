// Terminal client: prints the summary as it streams in.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tldr_stream::client::{SummaryClient, SummarySession, TerminalView};
use tldr_stream::core::models::{SummaryLength, SummaryRequest};
use tokio::io::AsyncReadExt;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "tldr-stream", about = "Summarize text through a tldr-stream relay")]
struct Args {
    /// Text to summarize. Read from --file or stdin when omitted.
    text: Option<String>,

    /// Read the text from a file
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// short, medium or long
    #[arg(short, long, default_value = "medium")]
    length: String,

    /// Relay base URL
    #[arg(long, env = "TLDR_STREAM_SERVER", default_value = "http://127.0.0.1:3000")]
    server: Url,
}

async fn read_content(args: &Args) -> Result<String> {
    if let Some(text) = &args.text {
        return Ok(text.clone());
    }
    if let Some(path) = &args.file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()));
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("Failed to read stdin")?;
    Ok(buf)
}

#[tokio::main]
async fn main() -> Result<()> {
    tldr_stream::setup_cli_logging();
    let args = Args::parse();

    let content = read_content(&args).await?;
    // The flag is forgiving about case; the wire key is not.
    let length = SummaryLength::parse_or_default(&args.length.trim().to_ascii_lowercase());
    let request = SummaryRequest::new(content, length);

    let mut session = SummarySession::new(SummaryClient::new(&args.server)?);
    let mut view = TerminalView::new(std::io::stdout(), std::io::stderr());

    tokio::select! {
        result = session.submit(&request, &mut view) => {
            // The view has already printed a user-facing message on failure.
            if result.is_err() {
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            // Dropping the submit future closes the connection to the relay.
            bail!("Interrupted");
        }
    }

    Ok(())
}
