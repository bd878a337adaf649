use crate::camera::CameraError;
use crate::frame::Frame;

/// Anything that yields grayscale frames one at a time.
///
/// An `Err` ends whatever loop is consuming the source; there is no retry.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;

    /// Pull and drop `count` frames (camera AGC/AE settling).
    fn discard(&mut self, count: usize) -> Result<(), CameraError> {
        for _ in 0..count {
            self.next_frame()?;
        }
        Ok(())
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        (**self).next_frame()
    }
}
