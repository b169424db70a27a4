use crate::detection::domain::face_shape::FaceShape;
use crate::shared::frame::Frame;
use crate::shared::region::Region;

/// Domain interface for facial landmark regression.
///
/// Given a frame and one detected face, returns the 68-point shape in
/// frame coordinates.
pub trait LandmarkExtractor: Send {
    fn extract(
        &mut self,
        frame: &Frame,
        face: &Region,
    ) -> Result<FaceShape, Box<dyn std::error::Error>>;
}
