//! rollcall-core — face detection, face chips, embeddings and the trained model.
//!
//! SCRFD locates faces and ArcFace embeds them, both through ONNX Runtime on
//! the CPU. The trained model is a nearest-neighbour gallery over embeddings.

pub mod alignment;
pub mod chip;
pub mod detector;
pub mod model;
pub mod recognizer;
pub mod types;

pub use chip::{ChipError, FaceChip, CHIP_SIZE};
pub use detector::{DetectorError, FaceDetector, DETECTOR_MODEL_FILE};
pub use model::{ModelError, Prediction, TrainedModel};
pub use recognizer::{FaceRecognizer, RecognizerError, RECOGNIZER_MODEL_FILE};
pub use types::{BoundingBox, Embedding, FaceEncoder, FaceLocator};
