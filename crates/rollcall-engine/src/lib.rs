//! rollcall-engine — registration, training and attendance sessions over a
//! camera and the CSV data layout.
//!
//! Capture loops are blocking and generic over [`rollcall_hw::FrameSource`],
//! [`rollcall_core::FaceLocator`] and [`rollcall_core::FaceEncoder`]. They are
//! meant to run on their own thread and are stopped through a [`StopHandle`].

pub mod attendance;
pub mod config;
pub mod enroll;
pub mod error;
pub mod session;
pub mod stop;
pub mod system;
pub mod training;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError};
pub use enroll::Registration;
pub use error::EngineError;
pub use session::{AttendanceSession, Recognition, SessionSummary};
pub use stop::StopHandle;
pub use system::AttendanceSystem;
pub use training::TrainingReport;
