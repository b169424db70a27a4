use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::alerting::domain::alert_notifier::AlertNotifier;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_selector::FaceSelection;
use crate::detection::domain::face_shape::FaceShape;
use crate::detection::domain::landmark_extractor::LandmarkExtractor;
use crate::monitoring::domain::drowsiness_monitor::{AlarmEvent, DrowsinessMonitor};
use crate::monitoring::domain::eye_aspect_ratio::EarReading;
use crate::presentation::domain::alarm_snapshots::AlarmSnapshots;
use crate::presentation::domain::frame_sink::FrameSink;
use crate::presentation::domain::overlay;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

use super::errors::FrameError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};

/// Why the frame loop stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EndReason {
    EndOfStream,
    Cancelled,
    FrameLimit,
    /// The source failed mid-stream; carries the error message.
    SourceFailed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_processed: usize,
    pub frames_with_face: usize,
    /// Frames dropped by a recoverable detection, landmark or geometry error.
    pub skipped_frames: usize,
    pub alarms_raised: usize,
    pub end_reason: EndReason,
}

/// What one frame contributed after detection and landmarks.
struct FaceReading {
    shape: FaceShape,
    ear: EarReading,
}

/// Runs the monitoring loop: source, detect, select, landmarks, EAR,
/// monitor, overlay, sink.
///
/// Single-threaded and single-use: `execute` consumes the use case. The only
/// work leaving the loop thread is whatever the notifier does with an
/// alarm event.
pub struct MonitorDrowsinessUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn FaceDetector>,
    extractor: Box<dyn LandmarkExtractor>,
    monitor: DrowsinessMonitor,
    notifier: Box<dyn AlertNotifier>,
    sink: Box<dyn FrameSink>,
    selection: FaceSelection,
    snapshots: Option<AlarmSnapshots>,
    logger: Box<dyn PipelineLogger>,
    max_frames: Option<usize>,
    cancelled: Arc<AtomicBool>,
}

impl MonitorDrowsinessUseCase {
    /// `source` must already be open; the use case closes it when done.
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn FaceDetector>,
        extractor: Box<dyn LandmarkExtractor>,
        monitor: DrowsinessMonitor,
        notifier: Box<dyn AlertNotifier>,
        sink: Box<dyn FrameSink>,
    ) -> Self {
        Self {
            source,
            detector,
            extractor,
            monitor,
            notifier,
            sink,
            selection: FaceSelection::default(),
            snapshots: None,
            logger: Box::new(NullPipelineLogger),
            max_frames: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_selection(mut self, selection: FaceSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_snapshots(mut self, snapshots: AlarmSnapshots) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn with_cancellation(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    /// Processes frames until the source ends, the flag is raised or the
    /// frame limit is hit.
    ///
    /// Per-frame errors never end the loop. The only error returned is a
    /// failure to finalize the sink.
    pub fn execute(
        mut self,
        metadata: &VideoMetadata,
    ) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let mut summary = RunSummary {
            frames_processed: 0,
            frames_with_face: 0,
            skipped_frames: 0,
            alarms_raised: 0,
            end_reason: EndReason::EndOfStream,
        };

        summary.end_reason = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                break EndReason::Cancelled;
            }
            if self
                .max_frames
                .is_some_and(|limit| summary.frames_processed >= limit)
            {
                break EndReason::FrameLimit;
            }

            let mut frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break EndReason::EndOfStream,
                Err(e) => {
                    log::error!("Frame source failed: {e}");
                    break EndReason::SourceFailed(e.to_string());
                }
            };

            self.process_frame(&mut frame, &mut summary);

            summary.frames_processed += 1;
            self.logger
                .progress(summary.frames_processed, metadata.total_frames);
        };

        self.source.close();
        self.logger.summary();
        self.sink.close()?;

        log::info!(
            "Stopped after {} frames ({:?}), {} alarm(s)",
            summary.frames_processed,
            summary.end_reason,
            summary.alarms_raised
        );
        Ok(summary)
    }

    fn process_frame(&mut self, frame: &mut Frame, summary: &mut RunSummary) {
        let index = frame.index();

        let reading = match self.read_face(frame) {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("Skipping frame {index}: {e}");
                summary.skipped_frames += 1;
                None
            }
        };

        let mut event = None;
        if let Some(reading) = &reading {
            summary.frames_with_face += 1;
            self.logger.metric("ear", reading.ear.average);
            event = self.monitor.observe(reading.ear.average).event;
        }

        let overlay_start = Instant::now();
        overlay::annotate(
            frame,
            reading.as_ref().map(|r| &r.shape),
            reading.as_ref().map(|r| r.ear.average),
            self.monitor.state().status(),
        );
        self.logger
            .timing("overlay", overlay_start.elapsed().as_secs_f64() * 1000.0);

        match event {
            Some(AlarmEvent::Start) => {
                log::warn!("Drowsiness detected! Wake up! (frame {index})");
                summary.alarms_raised += 1;
                self.logger.alarm(index);
                self.notifier.notify(AlarmEvent::Start);
                if let Some(snapshots) = &self.snapshots {
                    match snapshots.save(frame) {
                        Ok(path) => log::info!("Saved alarm snapshot to {}", path.display()),
                        Err(e) => log::warn!("Failed to save alarm snapshot: {e}"),
                    }
                }
            }
            Some(AlarmEvent::Stop) => {
                log::info!("Eyes open again, alarm cleared (frame {index})");
                self.notifier.notify(AlarmEvent::Stop);
            }
            None => {}
        }

        if let Err(e) = self.sink.show(frame) {
            log::warn!("Failed to show frame {index}: {e}");
        }
    }

    /// Detects, selects and measures one face. `Ok(None)` means no face.
    fn read_face(&mut self, frame: &Frame) -> Result<Option<FaceReading>, FrameError> {
        let detect_start = Instant::now();
        let regions = self
            .detector
            .detect(frame)
            .map_err(|e| FrameError::Detection(e.to_string()))?;
        self.logger
            .timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);

        let Some(region) = self.selection.select(&regions) else {
            return Ok(None);
        };

        let landmarks_start = Instant::now();
        let shape = self
            .extractor
            .extract(frame, region)
            .map_err(|e| FrameError::Landmarks(e.to_string()))?;
        self.logger
            .timing("landmarks", landmarks_start.elapsed().as_secs_f64() * 1000.0);

        let ear = EarReading::from_eyes(&shape.left_eye(), &shape.right_eye())?;
        Ok(Some(FaceReading { shape, ear }))
    }
}
