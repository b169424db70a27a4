use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Pull-based source of successive frames (camera or file).
///
/// The source is chosen when the implementation is constructed; `open`
/// acquires it. `next_frame` may block on hardware I/O and returns
/// `Ok(None)` at end of stream.
pub trait FrameSource: Send {
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases the device or file. Safe to call more than once.
    fn close(&mut self);
}
