//! JSON-lines event source

use crate::error::ProducerError;
use jet_image_common::Event;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// Reads one [`Event`] per line; blank lines are skipped
pub struct EventSource<R> {
    lines: Lines<R>,
    line: usize,
}

impl EventSource<BufReader<File>> {
    /// Open a JSON-lines event file
    ///
    /// # Errors
    /// Returns error if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProducerError> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> EventSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for EventSource<R> {
    type Item = Result<Event, ProducerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let read = self.lines.next()?;
            self.line += 1;
            let line = match read {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(
                serde_json::from_str(&line).map_err(|source| ProducerError::EventParse {
                    line: self.line,
                    source,
                }),
            );
        }
    }
}
