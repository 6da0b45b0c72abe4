//! Jet image CLI - tag jets with an image classifier
//!
//! Command-line driver for the jet image producer.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::run::RunCommand;

#[derive(Parser)]
#[command(
    name = "jet-image",
    version,
    about = "Rasterize jets into images and rank classifier labels",
    long_about = "Reads events as JSON lines, turns the constituents of every jet into a\n\
                  pt-fraction image around the jet axis, runs the batch through an ONNX\n\
                  classifier and reports the top-N labels per jet.\n\n\
                  Three client modes:\n  \
                  - sync: inference on the event loop\n  \
                  - async: inference on the tokio blocking pool\n  \
                  - pseudo-async: inference on a dedicated worker thread",
    after_help = "EXAMPLES:\n  \
                  # Print a configuration template\n  \
                  jet-image describe > jet_image.yaml\n\n  \
                  # Process events with the configured client\n  \
                  jet-image run --config jet_image.yaml --events events.jsonl\n\n  \
                  # Synchronous client, first 10 events, reports and images on disk\n  \
                  jet-image run -c jet_image.yaml -e events.jsonl --mode sync --max-events 10 \\\n    \
                  --output reports.jsonl --dump-images ./jet_images"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an event file and report the top labels of every jet
    Run(RunCommand),

    /// Print a configuration template
    Describe,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Commands::Describe => Level::WARN,
        _ => {
            if cli.verbose {
                Level::DEBUG
            } else {
                Level::INFO
            }
        }
    };

    // Reports may go to stdout, keep logs on stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Run(cmd) => cmd.execute().await,
        Commands::Describe => commands::describe::print_template(),
    }
}
