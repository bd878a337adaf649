//! rollcall-hw — camera capture and grayscale frames.
//!
//! Provides V4L2 capture through the `v4l` crate and the [`FrameSource`]
//! seam the capture loops are written against.

pub mod camera;
pub mod frame;
pub mod source;

pub use camera::{Camera, CameraError, CameraStream, DeviceInfo, PixelFormat};
pub use frame::Frame;
pub use source::FrameSource;
