use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for locating faces in a frame.
///
/// Regions come back in the detector's own order; choosing which face to
/// monitor is the caller's job. Implementations may keep state between
/// frames, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Region>, Box<dyn std::error::Error>>;
}
