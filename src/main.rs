use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use llm_stream_parser::ParserConfig;
use llm_stream_parser::json::{self, Completion, PendingScalars};
use llm_stream_parser::streaming::{SseStreamExt, StreamingChunkAssembler};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::ReaderStream;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "llm-stream-parser", version, about = "Parse SSE streams and partial JSON")]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print each SSE event as a JSON line
    Events { input: Option<PathBuf> },
    /// Repair a truncated JSON document
    Repair {
        input: Option<PathBuf>,
        /// Policy for a trailing in-progress scalar (close|omit)
        #[arg(long, default_value = "close")]
        pending: PendingScalars,
    },
    /// Complete a truncated JSON document with closing characters only
    Complete { input: Option<PathBuf> },
    /// Decode event payloads as one growing JSON document
    Decode {
        input: Option<PathBuf>,
        /// Data payload that ends the stream
        #[arg(long, default_value = "[DONE]")]
        done_marker: String,
        /// Event type that ends the stream
        #[arg(long, default_value = "message_stop")]
        stop_event: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ParserConfig::from_file(path)?,
        None => ParserConfig::from_env()?,
    };
    config.validate()?;

    match cli.command {
        Command::Events { input } => {
            let reader = open_input(input.as_deref()).await?;
            let mut events = Box::pin(ReaderStream::new(reader).sse_events());
            let mut count = 0usize;
            while let Some(event) = events.next().await {
                let event = event.context("Failed to read input")?;
                println!("{}", serde_json::to_string(&event)?);
                count += 1;
            }
            info!(count, "Finished reading events");
        }
        Command::Repair { input, pending } => {
            let text = read_text(input.as_deref()).await?;
            let repaired = json::repair_with(&text, pending, &config.limits())?;
            if repaired.depth_exceeded || repaired.truncated {
                info!(
                    depth_exceeded = repaired.depth_exceeded,
                    truncated = repaired.truncated,
                    "Input was cut back"
                );
            }
            println!("{}", repaired.text);
        }
        Command::Complete { input } => {
            let text = read_text(input.as_deref()).await?;
            let completion = json::complete(&text, &config.limits())?;
            if completion == Completion::NotNeeded {
                info!("Input is already a complete document");
            }
            println!("{}", completion.apply(&text));
        }
        Command::Decode {
            input,
            done_marker,
            stop_event,
        } => {
            let reader = open_input(input.as_deref()).await?;
            let mut events = Box::pin(ReaderStream::new(reader).sse_events());
            let mut assembler =
                StreamingChunkAssembler::<Value>::with_options(config.assembler_options());
            let mut shown = String::new();

            while let Some(event) = events.next().await {
                let event = event.context("Failed to read input")?;
                if event.data == done_marker || event.event_type() == stop_event {
                    break;
                }
                if let Some(partial) = assembler.push(&event.data) {
                    let rendered = serde_json::to_string(partial)?;
                    if rendered != shown {
                        println!("{}", rendered);
                        shown = rendered;
                    }
                }
            }

            let value = assembler.finish()?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            info!("{}", assembler.stats().snapshot());
        }
    }

    Ok(())
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    Ok(match path {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    })
}

async fn read_text(path: Option<&Path>) -> Result<String> {
    let mut reader = open_input(path).await?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
