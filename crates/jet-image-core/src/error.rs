//! Error types for the jet image producer

use crate::client::ClientError;
use crate::onnx_utils::OnnxError;
use jet_image_builder::ImageError;
use jet_image_common::EventId;
use jet_image_top_n::{LabelListError, ScoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error(transparent)]
    MissingFile(#[from] LabelListError),

    #[error("Client nInput = {n_input} != {npix}*{npix}*{ncol} = {dim}")]
    InconsistentParameters {
        n_input: usize,
        npix: usize,
        ncol: usize,
        dim: usize,
    },

    #[error("Jet collection '{tag}' not found in event {event}")]
    MissingCollection { tag: String, event: EventId },

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Inference client error: {0}")]
    Client(#[from] ClientError),

    #[error("Score buffer error: {0}")]
    Scores(#[from] ScoreError),

    #[error("Model error: {0}")]
    Onnx(#[from] OnnxError),

    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Malformed event on line {line}: {source}")]
    EventParse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProducerError {
    /// Configuration-time errors abort processing; everything else only
    /// affects the current event
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProducerError::MissingFile(_)
                | ProducerError::InconsistentParameters { .. }
                | ProducerError::Image(_)
                | ProducerError::Onnx(_)
                | ProducerError::Config(_)
        )
    }
}
