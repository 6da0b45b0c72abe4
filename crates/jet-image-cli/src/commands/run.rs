//! Event processing command

use anyhow::{Context as _, Result};
use clap::{Args, ValueEnum};
use jet_image_builder::render_entry;
use jet_image_common::Event;
use jet_image_core::{
    AsyncClient, ClientMode, EventSource, InferenceClient, JetImageProducer,
    JetImageProducerAsync, JetImageProducerPseudoAsync, JetImageProducerSync, OnnxBackend,
    ProducerConfig, PseudoAsyncClient, SyncClient,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Sync,
    Async,
    PseudoAsync,
}

impl From<ModeArg> for ClientMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Sync => ClientMode::Sync,
            ModeArg::Async => ClientMode::Async,
            ModeArg::PseudoAsync => ClientMode::PseudoAsync,
        }
    }
}

#[derive(Args)]
pub struct RunCommand {
    /// Producer configuration (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Events, one JSON object per line
    #[arg(short, long, value_name = "FILE")]
    events: PathBuf,

    /// Client mode, overrides client.mode of the configuration
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Stop after this many events
    #[arg(long)]
    max_events: Option<usize>,

    /// Write one JSON report per event to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Save every jet image as PNG (channel 0) into this directory
    #[arg(long, value_name = "DIR")]
    dump_images: Option<PathBuf>,
}

impl RunCommand {
    pub async fn execute(self) -> Result<()> {
        let mut config = ProducerConfig::from_yaml(&self.config)
            .with_context(|| format!("Failed to load configuration {}", self.config.display()))?;
        if let Some(mode) = self.mode {
            config.client.mode = mode.into();
        }

        info!("=== Jet Image Producer ===");
        info!("Configuration: {}", self.config.display());
        info!("Events: {}", self.events.display());
        info!("Model: {}", config.client.model_path.display());
        info!("Client mode: {}", config.client.mode);

        let backend = OnnxBackend::new(&config.client).context("Failed to load model")?;
        let name = client_name(&config.client.model_path);

        match config.client.mode {
            ClientMode::Sync => {
                let client = SyncClient::new(name, &config.client, backend);
                let producer: JetImageProducerSync = JetImageProducer::new(&config, client)?;
                self.run_events(&config, producer).await
            }
            ClientMode::Async => {
                let client = AsyncClient::new(name, &config.client, backend);
                let producer: JetImageProducerAsync = JetImageProducer::new(&config, client)?;
                self.run_events(&config, producer).await
            }
            ClientMode::PseudoAsync => {
                let client = PseudoAsyncClient::new(name, &config.client, backend)?;
                let producer: JetImageProducerPseudoAsync =
                    JetImageProducer::new(&config, client)?;
                self.run_events(&config, producer).await
            }
        }
    }

    async fn run_events<C: InferenceClient>(
        &self,
        config: &ProducerConfig,
        mut producer: JetImageProducer<C>,
    ) -> Result<()> {
        let source = EventSource::open(&self.events)
            .with_context(|| format!("Failed to open events {}", self.events.display()))?;

        let mut out: Box<dyn Write> = match &self.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path)
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        };
        if let Some(dir) = &self.dump_images {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }

        let start = Instant::now();
        let mut processed = 0usize;
        let mut failed = 0usize;
        let mut jets = 0usize;

        for (index, event) in source.enumerate() {
            if self.max_events.is_some_and(|max| index >= max) {
                break;
            }

            let result = match event {
                Ok(event) => {
                    if let Some(dir) = &self.dump_images {
                        dump_images(dir, config, &producer, &event)?;
                    }
                    producer.process(&event).await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(report) => {
                    processed += 1;
                    jets += report.stats.jets;
                    serde_json::to_writer(&mut out, &report)?;
                    writeln!(out)?;
                }
                Err(e) if e.is_fatal() => return Err(e).context("Processing aborted"),
                Err(e) => {
                    failed += 1;
                    warn!("Skipping event: {}", e);
                }
            }
        }
        out.flush()?;

        info!(
            "Processed {} events ({} jets, {} failed) in {:.2}s",
            processed,
            jets,
            failed,
            start.elapsed().as_secs_f64()
        );
        Ok(())
    }
}

/// Client name derived from the model file
fn client_name(model_path: &Path) -> String {
    model_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "onnx".to_string())
}

fn dump_images<C: InferenceClient>(
    dir: &Path,
    config: &ProducerConfig,
    producer: &JetImageProducer<C>,
    event: &Event,
) -> Result<()> {
    let Some(jets) = event.jets(&config.jet_tag) else {
        return Ok(());
    };
    let tensor = producer.builder().build(jets);
    for jet in 0..tensor.batch_size() {
        let image = render_entry(&tensor, jet, 0)?;
        let path = dir.join(format!(
            "{}_{}_{}_jet{}.png",
            event.id.run, event.id.lumi, event.id.event, jet
        ));
        image
            .save(&path)
            .with_context(|| format!("Failed to save {}", path.display()))?;
    }
    Ok(())
}
