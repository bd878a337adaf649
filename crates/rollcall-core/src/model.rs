//! Trained face model: a labelled gallery of embeddings.
//!
//! Training keeps every sample and prediction is nearest-neighbour over the
//! whole gallery. The artifact has no version; its presence on disk is the
//! only thing that marks the system as trained.

use crate::types::Embedding;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("no training samples")]
    NoSamples,
    #[error("trained model not found: {0}")]
    NotFound(String),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("model format: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Sample {
    label: u32,
    embedding: Embedding,
}

/// Best gallery match for a probe embedding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Label (student serial) of the nearest sample.
    pub label: u32,
    /// `(1 - cosine) * 100`; lower is a better match.
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    samples: Vec<Sample>,
}

impl TrainedModel {
    pub fn train(samples: Vec<(u32, Embedding)>) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::NoSamples);
        }
        Ok(Self {
            samples: samples
                .into_iter()
                .map(|(label, embedding)| Sample { label, embedding })
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of distinct labels in the gallery.
    pub fn label_count(&self) -> usize {
        let mut labels: Vec<u32> = self.samples.iter().map(|s| s.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels.len()
    }

    /// Nearest sample to `probe`. Every sample is compared; ties keep the
    /// earlier sample.
    pub fn predict(&self, probe: &Embedding) -> Option<Prediction> {
        let mut best: Option<Prediction> = None;
        for sample in &self.samples {
            let distance = probe.distance(&sample.embedding);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Prediction {
                    label: sample.label,
                    distance,
                });
            }
        }
        best
    }

    pub fn exists(path: &Path) -> bool {
        path.is_file()
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        tracing::debug!(path = %path.display(), samples = self.samples.len(), "saved trained model");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        if !path.is_file() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let model: Self = serde_json::from_slice(&fs::read(path)?)?;
        tracing::debug!(path = %path.display(), samples = model.samples.len(), "loaded trained model");
        Ok(model)
    }
}
