//! Inference client abstraction
//!
//! The producer talks to an inference engine through [`InferenceClient`]. The
//! engine itself is an [`InferenceBackend`]: a blocking call that maps a flat
//! input batch to a flat output batch. Three clients decide *where* that call
//! runs:
//!
//! - [`SyncClient`]: on the calling task
//! - [`AsyncClient`]: on the tokio blocking pool
//! - [`PseudoAsyncClient`]: on a dedicated worker thread that owns the backend
//!
//! All three validate buffer sizes, enforce the maximum batch size and retry
//! failed backend calls the same way, so the producer logic is identical
//! whichever one is plugged in.

mod async_client;
mod pseudo_async;
mod sync;

pub use async_client::AsyncClient;
pub use pseudo_async::PseudoAsyncClient;
pub use sync::SyncClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Inference client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Batch size {requested} exceeds maximum {max}")]
    BatchSizeExceeded { requested: usize, max: usize },

    #[error("Input length {actual} != batch size {batch_size} * nInput {n_input}")]
    InputSize {
        actual: usize,
        batch_size: usize,
        n_input: usize,
    },

    #[error("Output length {actual} != batch size {batch_size} * nOutput {n_output}")]
    OutputSize {
        actual: usize,
        batch_size: usize,
        n_output: usize,
    },

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("Inference worker disconnected")]
    WorkerDisconnected,

    #[error("Inference worker still busy with an abandoned batch")]
    WorkerBusy,

    #[error("Failed to start inference worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

/// How the inference call is scheduled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMode {
    Sync,
    Async,
    #[default]
    PseudoAsync,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMode::Sync => write!(f, "sync"),
            ClientMode::Async => write!(f, "async"),
            ClientMode::PseudoAsync => write!(f, "pseudo_async"),
        }
    }
}

/// Inference client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheduling of the inference call
    #[serde(default)]
    pub mode: ClientMode,
    /// Path to the ONNX model
    pub model_path: PathBuf,
    /// Values per batch entry the model consumes
    pub n_input: usize,
    /// Scores per batch entry the model produces
    pub n_output: usize,
    /// Per-entry input shape handed to the model (default `[n_input]`)
    #[serde(default)]
    pub input_shape: Option<Vec<usize>>,
    /// Maximum batch size (0 = unlimited)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Inference timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per inference call
    #[serde(default = "default_allowed_tries")]
    pub allowed_tries: u32,
    /// Log every inference call
    #[serde(default)]
    pub verbose: bool,
}

fn default_batch_size() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_allowed_tries() -> u32 {
    1
}

impl ClientConfig {
    /// Config with default scheduling, batch limit, timeout and retries
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, n_input: usize, n_output: usize) -> Self {
        Self {
            mode: ClientMode::default(),
            model_path: model_path.into(),
            n_input,
            n_output,
            input_shape: None,
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            allowed_tries: default_allowed_tries(),
            verbose: false,
        }
    }

    /// Timeout as a duration, `None` when disabled
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// A blocking inference engine
pub trait InferenceBackend: Send + 'static {
    /// Run one batch; `input.len() == batch_size * n_input`
    fn run(&mut self, input: &[f32], batch_size: usize) -> Result<Vec<f32>, ClientError>;
}

impl<F> InferenceBackend for F
where
    F: FnMut(&[f32], usize) -> Result<Vec<f32>, ClientError> + Send + 'static,
{
    fn run(&mut self, input: &[f32], batch_size: usize) -> Result<Vec<f32>, ClientError> {
        self(input, batch_size)
    }
}

/// Bookkeeping shared by every client: widths, batch size, retry policy
#[derive(Debug, Clone)]
pub struct ClientState {
    name: String,
    n_input: usize,
    n_output: usize,
    max_batch_size: usize,
    batch_size: usize,
    allowed_tries: u32,
    timeout: Option<Duration>,
    verbose: bool,
}

impl ClientState {
    #[must_use]
    pub fn new(name: impl Into<String>, config: &ClientConfig) -> Self {
        Self {
            name: name.into(),
            n_input: config.n_input,
            n_output: config.n_output,
            max_batch_size: config.batch_size,
            batch_size: 0,
            allowed_tries: config.allowed_tries.max(1),
            timeout: config.timeout(),
            verbose: config.verbose,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn n_input(&self) -> usize {
        self.n_input
    }

    #[must_use]
    pub fn n_output(&self) -> usize {
        self.n_output
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Set the batch size of the next inference call
    ///
    /// # Errors
    /// Returns `BatchSizeExceeded` above the configured maximum
    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ClientError> {
        if self.max_batch_size > 0 && batch_size > self.max_batch_size {
            return Err(ClientError::BatchSizeExceeded {
                requested: batch_size,
                max: self.max_batch_size,
            });
        }
        self.batch_size = batch_size;
        Ok(())
    }

    /// Check that `input` holds exactly one batch
    ///
    /// # Errors
    /// Returns `InputSize` on a length mismatch
    pub fn check_input(&self, input: &[f32]) -> Result<(), ClientError> {
        if input.len() != self.batch_size * self.n_input {
            return Err(ClientError::InputSize {
                actual: input.len(),
                batch_size: self.batch_size,
                n_input: self.n_input,
            });
        }
        Ok(())
    }

    /// Run the backend, retrying failed attempts up to `allowed_tries` in total
    ///
    /// # Errors
    /// Returns the error of the last attempt
    pub fn run_with_retries<B: InferenceBackend + ?Sized>(
        &self,
        backend: &mut B,
        input: &[f32],
    ) -> Result<Vec<f32>, ClientError> {
        let mut attempt = 1;
        loop {
            let result = backend
                .run(input, self.batch_size)
                .and_then(|output| self.check_output(output));
            match result {
                Ok(output) => return Ok(output),
                Err(e) if attempt < self.allowed_tries => {
                    warn!(
                        "{}: inference attempt {}/{} failed: {}",
                        self.name, attempt, self.allowed_tries, e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn check_output(&self, output: Vec<f32>) -> Result<Vec<f32>, ClientError> {
        if output.len() != self.batch_size * self.n_output {
            return Err(ClientError::OutputSize {
                actual: output.len(),
                batch_size: self.batch_size,
                n_output: self.n_output,
            });
        }
        Ok(output)
    }
}

/// Capability interface of an inference engine as seen by the producer
#[async_trait]
pub trait InferenceClient: Send {
    /// Shared bookkeeping
    fn state(&self) -> &ClientState;

    fn state_mut(&mut self) -> &mut ClientState;

    fn mode(&self) -> ClientMode;

    /// Name used in log messages
    fn name(&self) -> &str {
        self.state().name()
    }

    /// Values per batch entry the engine consumes
    fn n_input(&self) -> usize {
        self.state().n_input()
    }

    /// Scores per batch entry the engine produces
    fn n_output(&self) -> usize {
        self.state().n_output()
    }

    /// Batch size of the next call
    fn batch_size(&self) -> usize {
        self.state().batch_size()
    }

    fn set_batch_size(&mut self, batch_size: usize) -> Result<(), ClientError> {
        self.state_mut().set_batch_size(batch_size)
    }

    /// Run inference on one batch; takes ownership of the input buffer
    async fn evaluate(&mut self, input: Vec<f32>) -> Result<Vec<f32>, ClientError>;
}
