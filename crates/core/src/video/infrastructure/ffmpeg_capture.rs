use std::fmt;
use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureSource {
    /// Camera by index, opened through the platform's libavdevice backend.
    Camera(usize),
    File(PathBuf),
}

impl fmt::Display for CaptureSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureSource::Camera(index) => write!(f, "camera {index}"),
            CaptureSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Camera backend and device URL for `index` on this platform.
fn camera_device(index: usize) -> Option<(&'static str, String)> {
    #[cfg(target_os = "linux")]
    {
        Some(("v4l2", format!("/dev/video{index}")))
    }
    #[cfg(target_os = "macos")]
    {
        Some(("avfoundation", format!("{index}:none")))
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let _ = index;
        None
    }
}

/// Decodes frames from a camera or a video file via ffmpeg-next.
///
/// Each decoded frame is converted to RGB24 and wrapped in a [`Frame`].
pub struct FfmpegCapture {
    source: CaptureSource,
    state: Option<CaptureState>,
}

// Safety: FfmpegCapture is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCapture {}

impl FfmpegCapture {
    pub fn new(source: CaptureSource) -> Self {
        Self {
            source,
            state: None,
        }
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
        match &self.source {
            CaptureSource::File(path) => Ok(ffmpeg_next::format::input(path)?),
            CaptureSource::Camera(index) => {
                ffmpeg_next::device::register_all();
                let (backend, url) = camera_device(*index)
                    .ok_or("camera capture by index is not supported on this platform")?;
                let format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == backend)
                    .ok_or_else(|| format!("capture backend '{backend}' is not available"))?;
                let ctx =
                    ffmpeg_next::format::open_with(&url, &format, ffmpeg_next::Dictionary::new())?;
                Ok(ctx.input())
            }
        }
    }
}

impl FrameSource for FfmpegCapture {
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = self.open_input()?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let fps = [stream.avg_frame_rate(), stream.rate()]
            .into_iter()
            .find(|r| r.numerator() > 0 && r.denominator() > 0)
            .map(|r| r.numerator() as f64 / r.denominator() as f64)
            .unwrap_or(0.0);

        let (total_frames, source_path) = match &self.source {
            CaptureSource::Camera(_) => (None, None),
            CaptureSource::File(path) => {
                let frames = stream.frames();
                ((frames > 0).then_some(frames as usize), Some(path.clone()))
            }
        };

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path,
        };

        log::info!(
            "Opened {}: {}x{} @ {:.1} fps ({})",
            self.source,
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.codec
        );

        self.state = Some(CaptureState {
            ictx,
            decoder,
            scaler: None,
            stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        });

        Ok(metadata)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let state = self.state.as_mut().ok_or("FfmpegCapture: not opened")?;
        state.next_frame()
    }

    fn close(&mut self) {
        self.state = None;
    }
}

/// Open demuxer and decoder. The RGB scaler is built from the first decoded
/// frame, since devices may deliver a different pixel format than advertised.
struct CaptureState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl CaptureState {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(frame) = self.try_receive()? {
                    return Ok(Some(frame));
                }
                self.done = true;
                return Ok(None);
            };

            if stream.index() != self.stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let width = decoded.width();
        let height = decoded.height();
        let scaler = self.scaler_for(decoded.format(), width, height)?;

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn scaler_for(
        &mut self,
        format: ffmpeg_next::format::Pixel,
        width: u32,
        height: u32,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context, ffmpeg_next::Error> {
        let reusable = self.scaler.as_ref().is_some_and(|s| {
            let input = s.input();
            input.format == format && input.width == width && input.height == height
        });
        if !reusable {
            self.scaler = Some(ffmpeg_next::software::scaling::Context::get(
                format,
                width,
                height,
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?);
        }
        self.scaler.as_mut().ok_or(ffmpeg_next::Error::Bug)
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    /// Encodes `num_frames` grey MPEG-4 frames whose brightness steps by 40.
    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32) {
        let fps = 30;
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        let drain = |encoder: &mut ffmpeg_next::codec::encoder::video::Encoder,
                     octx: &mut ffmpeg_next::format::context::Output| {
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(octx).unwrap();
            }
        };

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            let value = ((i * 40) % 256) as u8;
            for row in 0..height as usize {
                data[row * stride..row * stride + width as usize * 3].fill(value);
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));

            encoder.send_frame(&yuv_frame).unwrap();
            drain(&mut encoder, &mut octx);
        }

        encoder.send_eof().unwrap();
        drain(&mut encoder, &mut octx);
        octx.write_trailer().unwrap();
    }

    fn video_capture(dir: &Path, frames: usize) -> (FfmpegCapture, PathBuf) {
        let path = dir.join("test.mp4");
        create_test_video(&path, frames, 160, 120);
        (FfmpegCapture::new(CaptureSource::File(path.clone())), path)
    }

    #[test]
    fn test_open_file_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let (mut capture, path) = video_capture(dir.path(), 5);

        let meta = capture.open().unwrap();

        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.fps > 0.0);
        assert_eq!(meta.source_path, Some(path));
    }

    #[test]
    fn test_next_frame_reads_to_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let (mut capture, _) = video_capture(dir.path(), 5);
        capture.open().unwrap();

        let mut frames = Vec::new();
        while let Some(frame) = capture.next_frame().unwrap() {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 5);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
        }
        // stays exhausted
        assert!(capture.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_png_file_decodes_exact_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("still.png");
        image::RgbImage::from_pixel(32, 24, image::Rgb([200, 40, 90]))
            .save(&path)
            .unwrap();

        let mut capture = FfmpegCapture::new(CaptureSource::File(path));
        let meta = capture.open().unwrap();
        let frame = capture.next_frame().unwrap().unwrap();

        assert_eq!((meta.width, meta.height), (32, 24));
        assert_eq!(frame.pixel(5, 5), Some([200, 40, 90]));
        assert!(capture.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_open_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut capture = FfmpegCapture::new(CaptureSource::File(dir.path().join("missing.mp4")));
        assert!(capture.open().is_err());
    }

    #[test]
    fn test_open_missing_camera_errors() {
        let mut capture = FfmpegCapture::new(CaptureSource::Camera(9999));
        assert!(capture.open().is_err());
    }

    #[test]
    fn test_next_frame_without_open_errors() {
        let mut capture = FfmpegCapture::new(CaptureSource::Camera(0));
        assert!(capture.next_frame().is_err());
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let (mut capture, _) = video_capture(dir.path(), 1);
        capture.open().unwrap();
        capture.close();
        capture.close();
        assert!(capture.next_frame().is_err());
    }

    #[test]
    fn test_source_display() {
        assert_eq!(CaptureSource::Camera(2).to_string(), "camera 2");
        assert_eq!(
            CaptureSource::File(PathBuf::from("/tmp/drive.mp4")).to_string(),
            "/tmp/drive.mp4"
        );
    }
}
