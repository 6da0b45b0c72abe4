//! Top-N ranking of classifier scores
//!
//! Turns the flat score buffer returned by an inference engine into, per batch
//! entry, the `n` most probable labels in descending score order.
//!
//! # Ordering
//! - Score descending; NaN scores sort after every number
//! - Equal scores: label ascending, then class index ascending
//!
//! Classes whose index has no label (model wider than the label list) are left
//! out of the ranking.
//!
//! # Example
//! ```
//! use jet_image_top_n::{rank, LabelList, ScoreBuffer};
//!
//! let labels: LabelList = ["cat", "dog", "fox"].into_iter().collect();
//! let scores = ScoreBuffer::new(vec![0.1, 0.9, 0.3], 1, 3).unwrap();
//!
//! let results = rank(&scores, &labels, 2);
//! assert_eq!(results[0].labels().collect::<Vec<_>>(), vec!["dog", "fox"]);
//! ```

pub mod labels;

pub use labels::LabelList;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

/// Label list errors
#[derive(Debug, Error)]
pub enum LabelListError {
    #[error("Could not open image list file: {path}: {source}")]
    MissingFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Score buffer errors
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Score buffer length {actual} != {batch_size} * {num_classes}")]
    LengthMismatch {
        actual: usize,
        batch_size: usize,
        num_classes: usize,
    },
}

/// Flat model output, `num_classes` scores per batch entry
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBuffer {
    data: Vec<f32>,
    batch_size: usize,
    num_classes: usize,
}

impl ScoreBuffer {
    /// Wrap a flat output buffer
    ///
    /// # Errors
    /// Returns error if `data.len() != batch_size * num_classes`
    pub fn new(data: Vec<f32>, batch_size: usize, num_classes: usize) -> Result<Self, ScoreError> {
        if data.len() != batch_size * num_classes {
            return Err(ScoreError::LengthMismatch {
                actual: data.len(),
                batch_size,
                num_classes,
            });
        }
        Ok(Self {
            data,
            batch_size,
            num_classes,
        })
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Scores of batch entry `batch`
    #[must_use]
    pub fn entry(&self, batch: usize) -> Option<&[f32]> {
        if batch >= self.batch_size {
            return None;
        }
        let start = batch * self.num_classes;
        Some(&self.data[start..start + self.num_classes])
    }
}

/// A single (label, score) pair of a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Class index in the model output
    pub class_id: usize,
    pub label: String,
    pub score: f32,
}

/// Ranked labels of one batch entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Position of the jet in the batch
    pub batch_index: usize,
    /// At most `n` entries, best first
    pub entries: Vec<RankedEntry>,
}

impl RankedResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best entry, if any
    #[must_use]
    pub fn top(&self) -> Option<&RankedEntry> {
        self.entries.first()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.label.as_str())
    }
}

impl fmt::Display for RankedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scores:")?;
        for entry in &self.entries {
            writeln!(f, "{} : {}", entry.label, entry.score)?;
        }
        Ok(())
    }
}

/// Ranks score buffers against a fixed label list
#[derive(Debug, Clone)]
pub struct TopNRanker {
    labels: LabelList,
    n: usize,
}

impl TopNRanker {
    #[must_use]
    pub fn new(labels: LabelList, n: usize) -> Self {
        Self { labels, n }
    }

    #[must_use]
    pub fn labels(&self) -> &LabelList {
        &self.labels
    }

    #[must_use]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Rank every batch entry of `scores`
    #[must_use]
    pub fn rank(&self, scores: &ScoreBuffer) -> Vec<RankedResult> {
        rank(scores, &self.labels, self.n)
    }
}

/// Rank every batch entry, in batch order
#[must_use]
pub fn rank(scores: &ScoreBuffer, labels: &LabelList, n: usize) -> Vec<RankedResult> {
    (0..scores.batch_size)
        .map(|batch_index| RankedResult {
            batch_index,
            entries: rank_entry(scores.entry(batch_index).unwrap_or(&[]), labels, n),
        })
        .collect()
}

/// Top `n` (label, score) pairs of a single score vector
#[must_use]
pub fn rank_entry(scores: &[f32], labels: &LabelList, n: usize) -> Vec<RankedEntry> {
    let width = scores.len().min(labels.len());
    if n == 0 || width == 0 {
        return Vec::new();
    }

    let order = |&a: &usize, &b: &usize| {
        compare_scores(scores[a], scores[b])
            .then_with(|| labels[a].cmp(&labels[b]))
            .then_with(|| a.cmp(&b))
    };

    let mut candidates: Vec<usize> = (0..width).collect();
    if n < width {
        candidates.select_nth_unstable_by(n - 1, order);
        candidates.truncate(n);
    }
    candidates.sort_unstable_by(order);

    candidates
        .into_iter()
        .map(|class_id| RankedEntry {
            class_id,
            label: labels[class_id].to_string(),
            score: scores[class_id],
        })
        .collect()
}

/// Descending score order with NaN last
fn compare_scores(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}
