//! Pre-trained text classifier artifacts and the predictor that composes them.
//!
//! All three artifacts are JSON documents written by the training pipeline.
//! They are loaded once at startup and never mutated.

pub mod classifier;
pub mod encoder;
pub mod predictor;
pub mod vectorizer;

use std::{fs, io, path::Path, path::PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use predictor::{Predictor, TextClassifier};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("failed to read {artifact} artifact {}: {source}", path.display())]
    Io {
        artifact: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    #[error("failed to parse {artifact} artifact {}: {source}", path.display())]
    Parse {
        artifact: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {artifact} artifact: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },
    #[error("class index {0} is not known to the label encoder")]
    UnknownClass(usize),
}

impl ModelError {
    pub(crate) fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        ModelError::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

pub(crate) fn load_json<T: DeserializeOwned>(
    artifact: &'static str,
    path: &Path,
) -> Result<T, ModelError> {
    let raw = fs::read_to_string(path).map_err(|source| ModelError::Io {
        artifact,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ModelError::Parse {
        artifact,
        path: path.to_path_buf(),
        source,
    })
}

/// Sparse feature row, entries sorted by column index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    pub fn from_sorted(entries: Vec<(usize, f64)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .ok()
            .map(|pos| self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, f64)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub(crate) fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}
