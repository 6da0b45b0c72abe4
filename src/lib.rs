//! Jet image tagging
//!
//! Jets are rasterized into pt-fraction images around their axis, classified
//! by an image model and reported as the top-N labels per jet.
//!
//! The workspace crates are re-exported here:
//!
//! - [`common`]: jets, constituents, events
//! - [`builder`]: jet images
//! - [`top_n`]: label ranking
//! - [`producer`]: inference clients and the producer

pub use jet_image_builder as builder;
pub use jet_image_common as common;
pub use jet_image_core as producer;
pub use jet_image_top_n as top_n;

pub use jet_image_builder::{ImageBuilder, ImageConfig, ImageTensor};
pub use jet_image_common::{Constituent, Event, EventId, Jet};
pub use jet_image_core::{
    ClientConfig, ClientMode, InferenceClient, JetImageProducer, ProducerConfig, ProducerError,
};
pub use jet_image_top_n::{LabelList, RankedResult, TopNRanker};
