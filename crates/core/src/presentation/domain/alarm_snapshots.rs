use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Saves the annotated frame on which each alarm started.
pub struct AlarmSnapshots {
    writer: Box<dyn ImageWriter>,
    dir: PathBuf,
}

impl AlarmSnapshots {
    pub fn new(writer: Box<dyn ImageWriter>, dir: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            dir: dir.into(),
        }
    }

    /// Path used for the snapshot of `frame_index`.
    pub fn path_for(&self, frame_index: usize) -> PathBuf {
        self.dir.join(format!("alarm_{frame_index:06}.png"))
    }

    pub fn save(&self, frame: &Frame) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = self.path_for(frame.index());
        self.writer.write(&path, frame)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    struct RecordingImageWriter {
        written: Arc<Mutex<Vec<PathBuf>>>,
    }

    impl ImageWriter for RecordingImageWriter {
        fn write(&self, path: &Path, _frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn test_save_names_file_after_frame_index() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = RecordingImageWriter {
            written: written.clone(),
        };
        let snapshots = AlarmSnapshots::new(Box::new(writer), "/tmp/alarms");

        let path = snapshots.save(&Frame::filled(4, 4, [0, 0, 0], 73)).unwrap();

        assert_eq!(path, PathBuf::from("/tmp/alarms/alarm_000073.png"));
        assert_eq!(*written.lock().unwrap(), vec![path]);
    }

    #[test]
    fn test_save_writes_png_with_image_writer() {
        use crate::video::infrastructure::image_file_writer::ImageFileWriter;

        let dir = tempfile::tempdir().unwrap();
        let snapshots = AlarmSnapshots::new(Box::new(ImageFileWriter::new()), dir.path());

        let path = snapshots.save(&Frame::filled(16, 8, [255, 0, 0], 5)).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (16, 8));
        assert_eq!(img.get_pixel(3, 3).0, [255, 0, 0]);
    }
}
