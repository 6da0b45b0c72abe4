//! ONNX Runtime backend for jet image classification
//!
//! Sessions are created with full graph optimizations and one intra-op thread
//! per physical core. Execution providers are tried in order: CUDA when
//! available, CPU otherwise.

use crate::client::{ClientConfig, ClientError, InferenceBackend};
use ndarray::{ArrayViewD, IxDyn};
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Error type for ONNX operations
#[derive(Debug, thiserror::Error)]
pub enum OnnxError {
    #[error("Failed to create session builder: {0}")]
    SessionBuilderError(String),

    #[error("Failed to load ONNX model from {path}: {error}")]
    ModelLoadError { path: String, error: String },

    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Input shape {shape:?} does not hold nInput = {n_input} values")]
    InputShape { shape: Vec<usize>, n_input: usize },
}

/// Intra-op thread count; `JET_IMAGE_THREADS` overrides the physical core count
fn intra_threads() -> usize {
    std::env::var("JET_IMAGE_THREADS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or_else(num_cpus::get_physical)
}

/// Create an optimized ONNX Runtime session
///
/// # Errors
/// Returns `ModelNotFound` if the file is missing, otherwise the session
/// builder or model loading error
pub fn create_session(model_path: &Path) -> Result<Session, OnnxError> {
    if !model_path.exists() {
        return Err(OnnxError::ModelNotFound(model_path.display().to_string()));
    }

    let start = Instant::now();
    let session = Session::builder()
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_intra_threads(intra_threads())
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_memory_pattern(true)
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .with_execution_providers([
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ])
        .map_err(|e| OnnxError::SessionBuilderError(e.to_string()))?
        .commit_from_file(model_path)
        .map_err(|e| OnnxError::ModelLoadError {
            path: model_path.display().to_string(),
            error: e.to_string(),
        })?;

    debug!(
        "Session created for model {} in {:.3}s",
        model_path.display(),
        start.elapsed().as_secs_f64()
    );
    Ok(session)
}

/// Inference backend running a local ONNX model
pub struct OnnxBackend {
    session: Session,
    model_path: PathBuf,
    /// Per-entry input shape, without the batch dimension
    input_shape: Vec<usize>,
}

impl OnnxBackend {
    /// Load the model named by the client configuration
    ///
    /// # Errors
    /// Returns error if the input shape does not match `n_input` or the model
    /// cannot be loaded
    pub fn new(config: &ClientConfig) -> Result<Self, OnnxError> {
        let input_shape = config
            .input_shape
            .clone()
            .unwrap_or_else(|| vec![config.n_input]);
        if input_shape.iter().product::<usize>() != config.n_input {
            return Err(OnnxError::InputShape {
                shape: input_shape,
                n_input: config.n_input,
            });
        }

        info!("Loading model from {}", config.model_path.display());
        let session = create_session(&config.model_path)?;

        Ok(Self {
            session,
            model_path: config.model_path.clone(),
            input_shape,
        })
    }

    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl InferenceBackend for OnnxBackend {
    fn run(&mut self, input: &[f32], batch_size: usize) -> Result<Vec<f32>, ClientError> {
        let mut dims = Vec::with_capacity(self.input_shape.len() + 1);
        dims.push(batch_size);
        dims.extend_from_slice(&self.input_shape);

        let input_array = ArrayViewD::from_shape(IxDyn(&dims), input)
            .map_err(|e| ClientError::Inference(e.to_string()))?;
        let input_tensor = TensorRef::from_array_view(input_array)
            .map_err(|e| ClientError::Inference(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| ClientError::Inference(e.to_string()))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClientError::Inference(e.to_string()))?;
        debug!("Model output shape: {:?}", shape);

        Ok(data.to_vec())
    }
}
