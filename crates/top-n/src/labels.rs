//! Class label lists

use crate::LabelListError;
use std::fs;
use std::ops::Index;
use std::path::Path;

/// Ordered class labels; position `i` names class `i` of the model output
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelList {
    labels: Vec<String>,
}

impl LabelList {
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Load a plain-text label list, one label per line
    ///
    /// Line order defines the class index. Empty lines are kept so that later
    /// labels stay aligned with their class index.
    ///
    /// # Errors
    /// Returns `MissingFile` if the file cannot be opened or read
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelListError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LabelListError::MissingFile {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parse label list text
    #[must_use]
    pub fn parse(content: &str) -> Self {
        Self {
            labels: content.lines().map(str::to_string).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[must_use]
    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.labels.get(class_id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Index<usize> for LabelList {
    type Output = str;

    fn index(&self, class_id: usize) -> &str {
        &self.labels[class_id]
    }
}

impl<S: Into<String>> FromIterator<S> for LabelList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            labels: iter.into_iter().map(Into::into).collect(),
        }
    }
}
