//! Jet image producer: event jets -> image batch -> inference -> top-N labels
//!
//! The producer runs in two phases per event, mirroring an acquire/produce
//! framework module:
//!
//! 1. [`JetImageProducer::acquire`] rasterizes the event's jets into one image
//!    batch and sizes the client batch accordingly.
//! 2. [`JetImageProducer::produce`] turns the engine output into ranked labels
//!    and reports them.
//!
//! [`JetImageProducer::process`] chains both around the client call.

use crate::client::{AsyncClient, InferenceClient, PseudoAsyncClient, SyncClient};
use crate::config::ProducerConfig;
use crate::error::ProducerError;
use crate::onnx_utils::OnnxBackend;
use jet_image_builder::{BuildStats, ImageBuilder, ImageTensor};
use jet_image_common::{Event, EventId};
use jet_image_top_n::{LabelList, RankedResult, ScoreBuffer, TopNRanker};
use serde::Serialize;
use tracing::{debug, info};

/// Producer evaluating jets synchronously on the event loop
pub type JetImageProducerSync = JetImageProducer<SyncClient<OnnxBackend>>;
/// Producer evaluating jets on the tokio blocking pool
pub type JetImageProducerAsync = JetImageProducer<AsyncClient<OnnxBackend>>;
/// Producer evaluating jets on a dedicated worker thread
pub type JetImageProducerPseudoAsync = JetImageProducer<PseudoAsyncClient>;

/// Everything reported for one event
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event: EventId,
    /// Client that evaluated the batch
    pub client: String,
    pub stats: BuildStats,
    /// One ranking per jet, in jet order
    pub results: Vec<RankedResult>,
}

pub struct JetImageProducer<C: InferenceClient> {
    debug_name: String,
    jet_tag: String,
    builder: ImageBuilder,
    ranker: TopNRanker,
    client: C,
}

impl<C: InferenceClient> JetImageProducer<C> {
    pub const DEBUG_NAME: &'static str = "JetImageProducer";

    /// Load the label list and check the image geometry against the client
    ///
    /// # Errors
    /// Returns `MissingFile` if the label list cannot be read and
    /// `InconsistentParameters` if `npix * npix * ncol != client.n_input()`
    pub fn new(config: &ProducerConfig, client: C) -> Result<Self, ProducerError> {
        let labels = LabelList::from_file(&config.image_list)?;
        info!(
            "{}: loaded {} labels from {}",
            Self::DEBUG_NAME,
            labels.len(),
            config.image_list.display()
        );
        Self::with_labels(config, labels, client)
    }

    /// Same as [`new`](Self::new) with an already loaded label list
    ///
    /// # Errors
    /// Returns `InconsistentParameters` if `npix * npix * ncol != client.n_input()`
    pub fn with_labels(
        config: &ProducerConfig,
        labels: LabelList,
        client: C,
    ) -> Result<Self, ProducerError> {
        let dim = config.npix * config.npix * config.ncol;
        if dim != client.n_input() {
            return Err(ProducerError::InconsistentParameters {
                n_input: client.n_input(),
                npix: config.npix,
                ncol: config.ncol,
                dim,
            });
        }
        if labels.len() != client.n_output() {
            debug!(
                "{}: {} labels for {} model outputs, ranking uses the first {}",
                Self::DEBUG_NAME,
                labels.len(),
                client.n_output(),
                labels.len().min(client.n_output())
            );
        }

        let builder = ImageBuilder::new(config.image_config())?;
        info!(
            "{}: {}x{}x{} images from '{}', top {} labels, client {} ({})",
            Self::DEBUG_NAME,
            config.npix,
            config.npix,
            config.ncol,
            config.jet_tag,
            config.top_n,
            client.name(),
            client.mode()
        );

        Ok(Self {
            debug_name: Self::DEBUG_NAME.to_string(),
            jet_tag: config.jet_tag.clone(),
            builder,
            ranker: TopNRanker::new(labels, config.top_n),
            client,
        })
    }

    #[must_use]
    pub fn client(&self) -> &C {
        &self.client
    }

    #[must_use]
    pub fn builder(&self) -> &ImageBuilder {
        &self.builder
    }

    #[must_use]
    pub fn ranker(&self) -> &TopNRanker {
        &self.ranker
    }

    /// Build the image batch for an event; the batch size becomes the jet count
    ///
    /// # Errors
    /// Returns error if the jet collection is missing or the client cannot take
    /// that many jets in one batch
    pub fn acquire(&mut self, event: &Event) -> Result<(ImageTensor, BuildStats), ProducerError> {
        let jets = event
            .jets(&self.jet_tag)
            .ok_or_else(|| ProducerError::MissingCollection {
                tag: self.jet_tag.clone(),
                event: event.id,
            })?;

        self.client.set_batch_size(jets.len())?;
        let (tensor, stats) = self.builder.build_with_stats(jets);

        debug!(
            "{}: event {}: {} jets, {} constituents, {} outside the image window",
            self.debug_name, event.id, stats.jets, stats.constituents, stats.dropped
        );
        Ok((tensor, stats))
    }

    /// Rank the engine output of the current batch and report it
    ///
    /// # Errors
    /// Returns error if `output` is not `batch_size * n_output` long
    pub fn produce(&self, output: Vec<f32>) -> Result<Vec<RankedResult>, ProducerError> {
        let scores = ScoreBuffer::new(output, self.client.batch_size(), self.client.n_output())?;
        let results = self.ranker.rank(&scores);
        for result in &results {
            info!("{}: jet {}\n{}", self.debug_name, result.batch_index, result);
        }
        Ok(results)
    }

    /// Acquire, evaluate and produce one event
    ///
    /// # Errors
    /// Returns the first error of any phase
    pub async fn process(&mut self, event: &Event) -> Result<EventReport, ProducerError> {
        let (tensor, stats) = self.acquire(event)?;
        let output = if tensor.batch_size() == 0 {
            Vec::new()
        } else {
            self.client.evaluate(tensor.into_vec()).await?
        };
        let results = self.produce(output)?;

        Ok(EventReport {
            event: event.id,
            client: self.client.name().to_string(),
            stats,
            results,
        })
    }
}
