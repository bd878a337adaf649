use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("face detector model not found at {0}")]
    MissingDetector(PathBuf),
    #[error("no trained model at {0}; train the system first")]
    ModelMissing(PathBuf),
    #[error("student with PRN {0} already exists")]
    DuplicateStudent(String),
    #[error("PRN {0:?} must not contain '_'")]
    InvalidPrn(String),
    #[error("field '{0}' is required")]
    MissingField(&'static str),
    #[error("session {0} is required")]
    MissingSessionDetail(&'static str),
    #[error("no training images found in {0}")]
    NoTrainingImages(PathBuf),
    #[error("camera error: {0}")]
    Camera(#[from] rollcall_hw::CameraError),
    #[error("detector error: {0}")]
    Detector(#[from] rollcall_core::DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] rollcall_core::RecognizerError),
    #[error("model error: {0}")]
    Model(#[from] rollcall_core::ModelError),
    #[error("face chip error: {0}")]
    Chip(#[from] rollcall_core::ChipError),
    #[error("storage error: {0}")]
    Store(#[from] rollcall_store::StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
