//! Jet image core - image batches in, ranked labels out
//!
//! This crate wires the jet image builder and the top-N ranker around an
//! inference engine:
//!
//! - [`client`]: the capability interface of an inference engine and its
//!   sync, async and pseudo-async schedulings
//! - [`onnx_utils`]: ONNX Runtime backend
//! - [`producer`]: per-event acquire/produce logic with configuration-time checks
//! - [`config`]: YAML configuration
//! - [`event_source`]: JSON-lines event input

pub mod client;
pub mod config;
pub mod error;
pub mod event_source;
pub mod onnx_utils;
pub mod producer;

pub use client::{
    AsyncClient, ClientConfig, ClientError, ClientMode, ClientState, InferenceBackend,
    InferenceClient, PseudoAsyncClient, SyncClient,
};
pub use config::ProducerConfig;
pub use error::ProducerError;
pub use event_source::EventSource;
pub use onnx_utils::{OnnxBackend, OnnxError};
pub use producer::{
    EventReport, JetImageProducer, JetImageProducerAsync, JetImageProducerPseudoAsync,
    JetImageProducerSync,
};
