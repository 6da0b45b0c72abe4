//! Jet image builder - rasterize jet constituents into a batched pixel grid
//!
//! Every jet of an event becomes one `npix x npix x channels` image centered on
//! the jet axis and spanning `[-1, +1]` in both the eta and phi offsets. The
//! images of all jets are stored back to back in one flat `f32` buffer, ready to
//! be handed to an inference engine as a single batch.
//!
//! # Pixel content
//! Each constituent adds `constituent.pt / jet.pt` to the pixel it falls into.
//! Only one physical quantity is modeled, so the same value is replicated into
//! every channel of the pixel (single-quantity replication across channels).
//!
//! # Window and boundary rule
//! - Constituents with `deta` or `dphi` outside `[-1, +1]` are dropped silently.
//!   Large-radius jets can lose a few particles this way.
//! - The window is closed: an offset of exactly `+1.0` is kept and lands in the
//!   last pixel (`npix - 1`).
//!
//! # Example
//! ```
//! use jet_image_builder::{ImageBuilder, ImageConfig};
//! use jet_image_common::{Constituent, Jet};
//!
//! let builder = ImageBuilder::new(ImageConfig { npix: 4, channels: 1 }).unwrap();
//! let jet = Jet::new(10.0, 0.0, 0.0).with_constituents(vec![Constituent::new(5.0, 0.3, -0.1)]);
//!
//! let tensor = builder.build(&[jet]);
//! assert_eq!(tensor.len(), 16);
//! assert_eq!(tensor.as_slice()[9], 0.5);
//! ```

pub mod render;

pub use render::render_entry;

use jet_image_common::Jet;
use ndarray::ArrayView4;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Image building errors
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Invalid image configuration: {0}")]
    InvalidConfig(String),
    #[error("Batch entry {index} out of range (batch size {batch_size})")]
    EntryOutOfRange { index: usize, batch_size: usize },
    #[error("Channel {channel} out of range ({channels} channels)")]
    ChannelOutOfRange { channel: usize, channels: usize },
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

/// Configuration for jet images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Pixels per side (square grid)
    pub npix: usize,
    /// Number of channels per pixel
    pub channels: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            npix: 224,
            channels: 3,
        }
    }
}

/// Memory layout of a batched jet image buffer
///
/// Batch entries are contiguous; inside an entry, pixels are row-major over
/// (eta, phi) and the channels of one pixel are adjacent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorLayout {
    pub npix: usize,
    pub channels: usize,
}

impl TensorLayout {
    #[must_use]
    pub fn new(npix: usize, channels: usize) -> Self {
        Self { npix, channels }
    }

    /// Number of values in one batch entry (`channels * npix * npix`)
    #[must_use]
    #[inline]
    pub fn entry_width(&self) -> usize {
        self.channels * self.npix * self.npix
    }

    /// Flat offset of (batch, eta pixel, phi pixel, channel)
    #[must_use]
    #[inline]
    pub fn offset(&self, batch: usize, eta_pixel: usize, phi_pixel: usize, channel: usize) -> usize {
        batch * self.entry_width() + self.channels * (eta_pixel * self.npix + phi_pixel) + channel
    }

    /// Total buffer length for `batch_size` entries
    #[must_use]
    #[inline]
    pub fn buffer_len(&self, batch_size: usize) -> usize {
        batch_size * self.entry_width()
    }
}

impl From<ImageConfig> for TensorLayout {
    fn from(config: ImageConfig) -> Self {
        Self::new(config.npix, config.channels)
    }
}

/// Flat batched image buffer, one entry per jet
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    batch_size: usize,
    layout: TensorLayout,
}

impl ImageTensor {
    /// Zero-initialized tensor for `batch_size` entries
    #[must_use]
    pub fn zeros(layout: TensorLayout, batch_size: usize) -> Self {
        Self {
            data: vec![0.0; layout.buffer_len(batch_size)],
            batch_size,
            layout,
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Hand the buffer over to the inference engine
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Values of one batch entry
    #[must_use]
    pub fn entry(&self, batch: usize) -> Option<&[f32]> {
        if batch >= self.batch_size {
            return None;
        }
        let width = self.layout.entry_width();
        let start = batch * width;
        Some(&self.data[start..start + width])
    }

    /// Single value at (batch, eta pixel, phi pixel, channel)
    #[must_use]
    pub fn get(&self, batch: usize, eta_pixel: usize, phi_pixel: usize, channel: usize) -> Option<f32> {
        let layout = self.layout;
        if batch >= self.batch_size
            || eta_pixel >= layout.npix
            || phi_pixel >= layout.npix
            || channel >= layout.channels
        {
            return None;
        }
        self.data
            .get(layout.offset(batch, eta_pixel, phi_pixel, channel))
            .copied()
    }

    /// Zero-copy 4-D view with shape (batch, npix, npix, channels)
    pub fn view(&self) -> Result<ArrayView4<'_, f32>, ImageError> {
        let layout = self.layout;
        Ok(ArrayView4::from_shape(
            (self.batch_size, layout.npix, layout.npix, layout.channels),
            &self.data,
        )?)
    }

    /// Sum over all values (useful for diagnostics)
    #[must_use]
    pub fn total(&self) -> f64 {
        self.data.iter().map(|&v| f64::from(v)).sum()
    }

    #[inline]
    fn add_to_pixel(&mut self, batch: usize, eta_pixel: usize, phi_pixel: usize, value: f32) {
        let base = self.layout.offset(batch, eta_pixel, phi_pixel, 0);
        for slot in &mut self.data[base..base + self.layout.channels] {
            *slot += value;
        }
    }
}

/// Counters collected while building one event's tensor
///
/// Purely diagnostic: they never influence the buffer contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Jets in the batch
    pub jets: usize,
    /// Constituents seen across all jets
    pub constituents: usize,
    /// Constituents accumulated into a pixel
    pub accepted: usize,
    /// Constituents outside the `[-1, +1]` window
    pub dropped: usize,
}

/// Builds batched jet images
#[derive(Debug, Clone, Copy)]
pub struct ImageBuilder {
    layout: TensorLayout,
}

impl ImageBuilder {
    /// Create a builder for the given image configuration
    ///
    /// # Errors
    /// Returns error if the pixel count or channel count is zero
    pub fn new(config: ImageConfig) -> Result<Self, ImageError> {
        if config.npix == 0 {
            return Err(ImageError::InvalidConfig(
                "npix must be at least 1".to_string(),
            ));
        }
        if config.channels == 0 {
            return Err(ImageError::InvalidConfig(
                "channels must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            layout: config.into(),
        })
    }

    #[must_use]
    pub fn layout(&self) -> TensorLayout {
        self.layout
    }

    /// Build the image tensor for all jets of an event
    #[must_use]
    pub fn build(&self, jets: &[Jet]) -> ImageTensor {
        self.build_with_stats(jets).0
    }

    /// Build the image tensor and report how many constituents were kept
    #[must_use]
    pub fn build_with_stats(&self, jets: &[Jet]) -> (ImageTensor, BuildStats) {
        let npix = self.layout.npix;
        let mut tensor = ImageTensor::zeros(self.layout, jets.len());
        let mut stats = BuildStats {
            jets: jets.len(),
            ..BuildStats::default()
        };

        for (batch, jet) in jets.iter().enumerate() {
            for constituent in &jet.constituents {
                stats.constituents += 1;

                let (deta, dphi) = jet.offset_of(constituent);
                if !in_window(deta) || !in_window(dphi) {
                    stats.dropped += 1;
                    continue;
                }

                let eta_pixel = pixel_index(deta, npix);
                let phi_pixel = pixel_index(dphi, npix);
                let value = (constituent.pt / jet.pt) as f32;
                tensor.add_to_pixel(batch, eta_pixel, phi_pixel, value);
                stats.accepted += 1;
            }
        }

        (tensor, stats)
    }
}

#[inline]
fn in_window(offset: f64) -> bool {
    (-1.0..=1.0).contains(&offset)
}

/// Pixel index of an in-window offset
///
/// `floor((d + 1) * npix / 2)`; `d + 1` is non-negative so truncation is a floor.
/// An offset of exactly `+1.0` maps to `npix - 1`.
#[must_use]
#[inline]
pub fn pixel_index(offset: f64, npix: usize) -> usize {
    let index = ((offset + 1.0) * npix as f64 / 2.0) as usize;
    index.min(npix - 1)
}
