use std::path::Path;

use crate::presentation::domain::frame_sink::FrameSink;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_writer::VideoWriter;

/// Records every shown frame to a video file.
pub struct RecordingFrameSink {
    writer: Box<dyn VideoWriter>,
    open: bool,
}

impl RecordingFrameSink {
    /// Opens `writer` on `path`; fails if the output cannot be created.
    pub fn open(
        mut writer: Box<dyn VideoWriter>,
        path: &Path,
        metadata: &VideoMetadata,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        writer.open(path, metadata)?;
        log::info!("Recording annotated video to {}", path.display());
        Ok(Self { writer, open: true })
    }
}

impl FrameSink for RecordingFrameSink {
    fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if !self.open {
            return Err("recording already closed".into());
        }
        self.writer.write(frame)
    }

    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        self.writer.close()
    }
}
