use std::path::PathBuf;

/// Describes an opened frame source.
///
/// Live camera sources have no known length, so `total_frames` is `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Frames per second as reported by the device or container; `0.0` when
    /// unknown.
    pub fps: f64,
    pub total_frames: Option<usize>,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn is_live(&self) -> bool {
        self.total_frames.is_none()
    }

    /// Reported frame rate, or `fallback` when the source did not report one.
    pub fn fps_or(&self, fallback: f64) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            fallback
        }
    }
}
