//! ArcFace embedding extraction via ONNX Runtime.
//!
//! Takes 112×112 face chips and produces L2-normalized 512-dimensional
//! embeddings (w600k_r50 model).

use crate::chip::{FaceChip, CHIP_SIZE};
use crate::types::{Embedding, FaceEncoder};
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 127.5; // symmetric, unlike SCRFD
const EMBEDDING_DIM: usize = 512;

/// File name of the recognition model inside the model directory.
pub const RECOGNIZER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum RecognizerError {
    #[error("recognition model not found: {0}; download w600k_r50.onnx from insightface")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

pub struct FaceRecognizer {
    session: Session,
}

impl FaceRecognizer {
    pub fn load(model_path: &Path) -> Result<Self, RecognizerError> {
        if !model_path.exists() {
            return Err(RecognizerError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded ArcFace recognizer"
        );

        Ok(Self { session })
    }

    pub fn embed_chip(&mut self, chip: &FaceChip) -> Result<Embedding, RecognizerError> {
        let input = chip_tensor(chip);
        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| RecognizerError::InferenceFailed(format!("embedding output: {e}")))?;

        if raw.len() != EMBEDDING_DIM {
            return Err(RecognizerError::InferenceFailed(format!(
                "expected {EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding::new(l2_normalize(raw)))
    }
}

impl FaceEncoder for FaceRecognizer {
    fn encode(&mut self, chip: &FaceChip) -> Result<Embedding, RecognizerError> {
        self.embed_chip(chip)
    }
}

fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}

fn chip_tensor(chip: &FaceChip) -> Array4<f32> {
    let mut tensor = Array4::<f32>::zeros((1, 3, CHIP_SIZE, CHIP_SIZE));
    for (i, &p) in chip.pixels().iter().enumerate() {
        let v = (p as f32 - PIXEL_MEAN) / PIXEL_STD;
        let (y, x) = (i / CHIP_SIZE, i % CHIP_SIZE);
        for c in 0..3 {
            tensor[[0, c, y, x]] = v;
        }
    }
    tensor
}
