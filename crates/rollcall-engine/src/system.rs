use crate::attendance;
use crate::config::Config;
use crate::enroll::{self, Registration};
use crate::error::Result;
use crate::session::{AttendanceSession, Recognition, SessionSummary};
use crate::stop::StopHandle;
use crate::training::{self, TrainingReport};
use rollcall_core::{FaceDetector, FaceEncoder, FaceLocator, FaceRecognizer};
use rollcall_hw::{Camera, FrameSource};
use rollcall_store::{DataLayout, NewStudent};

/// Configuration, data layout and the stop flag shared by every operation.
///
/// Capture operations take the frame source and models as arguments so
/// callers decide what to open; the loaders here build the real ones.
#[derive(Debug, Clone)]
pub struct AttendanceSystem {
    config: Config,
    layout: DataLayout,
    stop: StopHandle,
}

impl AttendanceSystem {
    pub fn new(config: Config) -> Self {
        let layout = DataLayout::new(&config.data_dir);
        Self {
            config,
            layout,
            stop: StopHandle::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    /// Create the working directories.
    pub fn init(&self) -> Result<()> {
        self.layout.ensure_dirs()?;
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Ask a running capture loop to finish after its current frame.
    pub fn stop_attendance(&self) {
        self.stop.stop();
    }

    pub fn open_camera(&self) -> Result<Camera> {
        let camera = Camera::open(&self.config.camera_device)?;
        tracing::info!(
            device = %camera.device_path,
            width = camera.width,
            height = camera.height,
            "camera opened"
        );
        Ok(camera)
    }

    /// Load SCRFD at `confidence`. A missing model file is
    /// [`EngineError::MissingDetector`](crate::EngineError::MissingDetector).
    pub fn load_detector(&self, confidence: f32) -> Result<FaceDetector> {
        enroll::ensure_detector(&self.config)?;
        let path = self.config.detector_model_path();
        let detector = FaceDetector::load(&path, confidence)?;
        tracing::info!(path = %path.display(), confidence, "SCRFD detector loaded");
        Ok(detector)
    }

    pub fn load_recognizer(&self) -> Result<FaceRecognizer> {
        let path = self.config.recognizer_model_path();
        let recognizer = FaceRecognizer::load(&path)?;
        tracing::info!(path = %path.display(), "ArcFace recognizer loaded");
        Ok(recognizer)
    }

    /// Validate a registration without touching the camera or models.
    pub fn check_registration(&self, student: &NewStudent) -> Result<()> {
        enroll::check_registration(&self.config, &self.layout, student)
    }

    pub fn take_student_images<S, L>(
        &self,
        source: &mut S,
        locator: &mut L,
        student: &NewStudent,
    ) -> Result<Registration>
    where
        S: FrameSource + ?Sized,
        L: FaceLocator + ?Sized,
    {
        enroll::take_student_images(&self.config, &self.layout, source, locator, student, &self.stop)
    }

    pub fn save_student_profile<E>(&self, encoder: &mut E) -> Result<TrainingReport>
    where
        E: FaceEncoder + ?Sized,
    {
        training::save_student_profile(&self.layout, encoder)
    }

    pub fn start_attendance<S, L, E, F>(
        &self,
        source: &mut S,
        locator: &mut L,
        encoder: &mut E,
        session: AttendanceSession,
        max_frames: Option<u64>,
        observe: F,
    ) -> Result<SessionSummary>
    where
        S: FrameSource + ?Sized,
        L: FaceLocator + ?Sized,
        E: FaceEncoder + ?Sized,
        F: FnMut(&Recognition),
    {
        attendance::start_attendance(
            &self.config,
            &self.layout,
            source,
            locator,
            encoder,
            session,
            max_frames,
            &self.stop,
            observe,
        )
    }
}
