//! Producer configuration loaded from YAML

use crate::client::{ClientConfig, ClientMode};
use crate::error::ProducerError;
use jet_image_builder::ImageConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Jet image producer configuration
///
/// ```yaml
/// jet_tag: slimmedJetsAK8
/// top_n: 5
/// npix: 224
/// ncol: 3
/// image_list: data/imagenet_classes.txt
/// client:
///   mode: pseudo_async
///   model_path: models/resnet50.onnx
///   n_input: 150528
///   n_output: 1000
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerConfig {
    /// Jet collection to read from each event
    #[serde(default = "default_jet_tag")]
    pub jet_tag: String,
    /// Labels reported per jet
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Pixels per image side
    #[serde(default = "default_npix")]
    pub npix: usize,
    /// Image channels
    #[serde(default = "default_ncol")]
    pub ncol: usize,
    /// Label list file, one class label per line
    pub image_list: PathBuf,
    pub client: ClientConfig,
}

fn default_jet_tag() -> String {
    "slimmedJetsAK8".to_string()
}

fn default_top_n() -> usize {
    5
}

fn default_npix() -> usize {
    224
}

fn default_ncol() -> usize {
    3
}

impl ProducerConfig {
    /// Config with default geometry and jet collection
    #[must_use]
    pub fn new(image_list: impl Into<PathBuf>, client: ClientConfig) -> Self {
        Self {
            jet_tag: default_jet_tag(),
            top_n: default_top_n(),
            npix: default_npix(),
            ncol: default_ncol(),
            image_list: image_list.into(),
            client,
        }
    }

    /// Load from a YAML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self, ProducerError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse from YAML text
    ///
    /// # Errors
    /// Returns error if the text is not a valid configuration
    pub fn from_yaml_str(contents: &str) -> Result<Self, ProducerError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Documented defaults for a 224x224 RGB ImageNet classifier
    #[must_use]
    pub fn template() -> Self {
        let npix = default_npix();
        let ncol = default_ncol();
        let mut client = ClientConfig::new("models/resnet50.onnx", npix * npix * ncol, 1000);
        client.mode = ClientMode::PseudoAsync;
        client.input_shape = Some(vec![npix, npix, ncol]);
        Self::new("data/imagenet_classes.txt", client)
    }

    /// Image geometry for the builder
    #[must_use]
    pub fn image_config(&self) -> ImageConfig {
        ImageConfig {
            npix: self.npix,
            channels: self.ncol,
        }
    }

    /// Serialize back to YAML
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, ProducerError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
