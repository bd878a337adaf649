//! Scripted stand-ins for the camera, detector and encoder.

use crate::config::Config;
use crate::stop::StopHandle;
use rollcall_core::{BoundingBox, DetectorError, Embedding, FaceChip, FaceEncoder, FaceLocator, RecognizerError};
use rollcall_hw::{CameraError, Frame, FrameSource};
use rollcall_store::DataLayout;
use std::collections::VecDeque;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

pub struct Fixture {
    pub _dir: tempfile::TempDir,
    pub config: Config,
    pub layout: DataLayout,
    pub stop: StopHandle,
}

/// Temp data dir with a placeholder detector file, no warmup and no
/// sample interval.
pub fn fixture(samples_per_student: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        model_dir: dir.path().join("models"),
        samples_per_student,
        sample_interval_ms: 0,
        warmup_frames: 0,
        ..Config::default()
    };
    std::fs::create_dir_all(&config.model_dir).unwrap();
    std::fs::write(config.detector_model_path(), b"").unwrap();

    let layout = DataLayout::new(&config.data_dir);
    layout.ensure_dirs().unwrap();
    Fixture {
        _dir: dir,
        config,
        layout,
        stop: StopHandle::new(),
    }
}

pub fn face(confidence: f32) -> BoundingBox {
    BoundingBox {
        x: 8.0,
        y: 8.0,
        width: 24.0,
        height: 24.0,
        confidence,
        landmarks: None,
    }
}

/// Yields the queued frames, then `StreamEnded`.
pub struct ScriptedFrames {
    frames: VecDeque<Frame>,
}

impl ScriptedFrames {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn lit(count: usize) -> Self {
        Self::new((0..count).map(|_| lit_frame()).collect())
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for ScriptedFrames {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        self.frames.pop_front().ok_or(CameraError::StreamEnded)
    }
}

pub fn lit_frame() -> Frame {
    Frame::from_gray(vec![128; (WIDTH * HEIGHT) as usize], WIDTH, HEIGHT, 0)
}

pub fn dark_frame() -> Frame {
    Frame::from_gray(vec![0; (WIDTH * HEIGHT) as usize], WIDTH, HEIGHT, 0)
}

/// Reports the same faces on every call.
pub struct ScriptedLocator {
    faces: Vec<BoundingBox>,
    pub calls: usize,
}

impl ScriptedLocator {
    pub fn always(faces: Vec<BoundingBox>) -> Self {
        Self { faces, calls: 0 }
    }
}

impl FaceLocator for ScriptedLocator {
    fn locate(&mut self, _gray: &[u8], _width: u32, _height: u32) -> Result<Vec<BoundingBox>, DetectorError> {
        self.calls += 1;
        Ok(self.faces.clone())
    }
}

/// Encoder backed by a closure.
pub struct FnEncoder<F> {
    f: F,
}

impl<F> FnEncoder<F>
where
    F: FnMut(&FaceChip) -> Result<Embedding, RecognizerError>,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> FaceEncoder for FnEncoder<F>
where
    F: FnMut(&FaceChip) -> Result<Embedding, RecognizerError>,
{
    fn encode(&mut self, chip: &FaceChip) -> Result<Embedding, RecognizerError> {
        (self.f)(chip)
    }
}

/// Encoder that hands out queued results in order, repeating the last one.
pub fn queued_encoder(
    results: Vec<Result<Embedding, RecognizerError>>,
) -> FnEncoder<impl FnMut(&FaceChip) -> Result<Embedding, RecognizerError>> {
    let mut queue: VecDeque<_> = results.into();
    let mut last = Embedding::new(vec![0.0, 0.0]);
    FnEncoder::new(move |_: &FaceChip| match queue.pop_front() {
        Some(Ok(e)) => {
            last = e.clone();
            Ok(e)
        }
        Some(Err(e)) => Err(e),
        None => Ok(last.clone()),
    })
}
