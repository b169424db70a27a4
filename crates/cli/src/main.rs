mod settings;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use drowsiguard_core::alerting::domain::alert_notifier::{AlertNotifier, NullAlertNotifier};
use drowsiguard_core::alerting::domain::alert_sound::{AlertSound, FallbackAlertSound};
use drowsiguard_core::alerting::domain::tone::Tone;
use drowsiguard_core::alerting::infrastructure::ffmpeg_tone_player::FfmpegTonePlayer;
use drowsiguard_core::alerting::infrastructure::terminal_bell::TerminalBell;
use drowsiguard_core::alerting::infrastructure::threaded_alert_notifier::ThreadedAlertNotifier;
use drowsiguard_core::detection::domain::face_detector::FaceDetector;
use drowsiguard_core::detection::domain::face_selector::FaceSelection;
use drowsiguard_core::detection::domain::landmark_extractor::LandmarkExtractor;
use drowsiguard_core::detection::infrastructure::onnx_landmark_extractor::{
    OnnxLandmarkExtractor, DEFAULT_CROP_MARGIN,
};
use drowsiguard_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use drowsiguard_core::detection::infrastructure::skip_frame_detector::SkipFrameDetector;
use drowsiguard_core::monitoring::domain::drowsiness_monitor::{DrowsinessMonitor, MonitorConfig};
use drowsiguard_core::pipeline::errors::StartupError;
use drowsiguard_core::pipeline::monitor_drowsiness_use_case::{
    EndReason, MonitorDrowsinessUseCase, RunSummary,
};
use drowsiguard_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use drowsiguard_core::presentation::domain::alarm_snapshots::AlarmSnapshots;
use drowsiguard_core::presentation::domain::frame_sink::{FrameSink, NullFrameSink};
use drowsiguard_core::presentation::infrastructure::recording_frame_sink::RecordingFrameSink;
use drowsiguard_core::shared::constants::{FACE_MODEL_NAME, FACE_MODEL_URL, LANDMARK_MODEL_NAME};
use drowsiguard_core::shared::model_resolver;
use drowsiguard_core::video::domain::frame_source::FrameSource;
use drowsiguard_core::video::infrastructure::ffmpeg_capture::{CaptureSource, FfmpegCapture};
use drowsiguard_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use drowsiguard_core::video::infrastructure::image_file_writer::ImageFileWriter;

use settings::Settings;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_DEVICE: i32 = 2;
const EXIT_MODEL: i32 = 3;

/// Webcam drowsiness detection. Type `q` and Enter to quit.
#[derive(Parser)]
#[command(name = "drowsiguard")]
struct Cli {
    /// Camera index to capture from.
    #[arg(long, default_value = "0", conflicts_with = "input")]
    camera: usize,

    /// Read frames from a video file instead of a camera.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Average eye aspect ratio below which the eyes count as closed.
    #[arg(long)]
    ear_threshold: Option<f64>,

    /// Consecutive closed-eye frames before the alarm starts.
    #[arg(long)]
    consec_frames: Option<usize>,

    /// Closed-eye duration before the alarm starts; overrides --consec-frames.
    #[arg(long)]
    closed_seconds: Option<f64>,

    /// Face to follow when several are visible: largest, first or last.
    #[arg(long)]
    face_selection: Option<FaceSelection>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Run face detection every Nth frame (1 = every frame).
    #[arg(long)]
    skip_frames: Option<usize>,

    /// 68-point landmark model (ONNX). Defaults to the model cache.
    #[arg(long)]
    landmark_model: Option<PathBuf>,

    /// Record the annotated stream to this video file.
    #[arg(long)]
    record: Option<PathBuf>,

    /// Save the frame on which each alarm starts as a PNG in this directory.
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Disable the alert sound.
    #[arg(long)]
    no_sound: bool,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Store the effective thresholds and options as the new defaults.
    #[arg(long)]
    save_settings: bool,
}

/// Flags merged over persisted settings.
#[derive(Debug, Clone, PartialEq)]
struct Options {
    ear_threshold: f64,
    consec_frames: usize,
    closed_seconds: Option<f64>,
    face_selection: FaceSelection,
    confidence: f64,
    skip_frames: usize,
    sound: bool,
}

impl Options {
    fn merge(cli: &Cli, settings: &Settings) -> Result<Self, StartupError> {
        let face_selection = match cli.face_selection {
            Some(selection) => selection,
            None => settings
                .face_selection
                .parse()
                .map_err(StartupError::InvalidConfig)?,
        };
        Ok(Self {
            ear_threshold: cli.ear_threshold.unwrap_or(settings.ear_threshold),
            consec_frames: cli.consec_frames.unwrap_or(settings.consec_frames),
            closed_seconds: cli.closed_seconds.or(settings.closed_seconds),
            face_selection,
            confidence: cli.confidence.unwrap_or(settings.confidence),
            skip_frames: cli.skip_frames.unwrap_or(settings.skip_frames),
            sound: settings.sound && !cli.no_sound,
        })
    }

    fn validate(&self) -> Result<(), StartupError> {
        MonitorConfig::new(self.ear_threshold, self.consec_frames)?;
        self.closed_duration()?;
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(StartupError::InvalidConfig(format!(
                "confidence must be between 0.0 and 1.0, got {}",
                self.confidence
            )));
        }
        if self.skip_frames == 0 {
            return Err(StartupError::InvalidConfig(
                "skip frames must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    fn closed_duration(&self) -> Result<Option<Duration>, StartupError> {
        let Some(seconds) = self.closed_seconds else {
            return Ok(None);
        };
        match Duration::try_from_secs_f64(seconds) {
            Ok(duration) if !duration.is_zero() => Ok(Some(duration)),
            _ => Err(StartupError::InvalidConfig(format!(
                "closed seconds must be a positive number of seconds, got {seconds}"
            ))),
        }
    }

    /// Final monitor thresholds once the source frame rate is known.
    fn monitor_config(&self, fps: f64) -> Result<MonitorConfig, StartupError> {
        let config = match self.closed_duration()? {
            Some(duration) => MonitorConfig::from_duration(self.ear_threshold, duration, fps)?,
            None => MonitorConfig::new(self.ear_threshold, self.consec_frames)?,
        };
        Ok(config)
    }

    fn to_settings(&self) -> Settings {
        Settings {
            ear_threshold: self.ear_threshold,
            consec_frames: self.consec_frames,
            closed_seconds: self.closed_seconds,
            face_selection: self.face_selection.to_string(),
            confidence: self.confidence,
            skip_frames: self.skip_frames,
            sound: self.sound,
        }
    }
}

fn main() {
    env_logger::init();

    let code = match run() {
        Ok(summary) => exit_code_for_summary(&summary),
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code_for_error(e.as_ref())
        }
    };
    process::exit(code);
}

fn run() -> Result<RunSummary, Box<dyn std::error::Error>> {
    let settings = Settings::load();
    let cli = Cli::parse();
    let options = Options::merge(&cli, &settings)?;
    options.validate()?;

    if cli.save_settings {
        let path = options.to_settings().save()?;
        log::info!("Saved settings to {}", path.display());
    }

    let detector = build_detector(&options)?;
    let extractor = build_extractor(cli.landmark_model.as_deref())?;

    let source = match &cli.input {
        Some(path) => CaptureSource::File(path.clone()),
        None => CaptureSource::Camera(cli.camera),
    };
    let mut capture = FfmpegCapture::new(source.clone());
    let metadata = capture
        .open()
        .map_err(|e| StartupError::DeviceUnavailable {
            source_name: source.to_string(),
            reason: e.to_string(),
        })?;

    let config = options.monitor_config(metadata.fps)?;
    match config.closure_duration(metadata.fps) {
        Some(duration) => log::info!(
            "Alarm after {} frames below EAR {} (~{:.1}s at {:.1} fps)",
            config.consec_frames,
            config.ear_threshold,
            duration.as_secs_f64(),
            metadata.fps
        ),
        None => log::info!(
            "Alarm after {} frames below EAR {}",
            config.consec_frames,
            config.ear_threshold
        ),
    }

    let sink: Box<dyn FrameSink> = match &cli.record {
        Some(path) => Box::new(RecordingFrameSink::open(
            Box::new(FfmpegWriter::new()),
            path,
            &metadata,
        )?),
        None => Box::new(NullFrameSink),
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    spawn_quit_listener(cancelled.clone());
    log::info!("Monitoring {source}. Type q and Enter to quit.");

    let mut use_case = MonitorDrowsinessUseCase::new(
        Box::new(capture),
        detector,
        extractor,
        DrowsinessMonitor::new(config),
        build_notifier(options.sound),
        sink,
    )
    .with_selection(options.face_selection)
    .with_logger(Box::new(StdoutPipelineLogger::default()))
    .with_max_frames(cli.max_frames)
    .with_cancellation(cancelled);

    if let Some(dir) = &cli.snapshot_dir {
        use_case = use_case.with_snapshots(AlarmSnapshots::new(
            Box::new(ImageFileWriter::new()),
            dir,
        ));
    }

    use_case.execute(&metadata)
}

fn build_detector(options: &Options) -> Result<Box<dyn FaceDetector>, StartupError> {
    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        FACE_MODEL_NAME,
        Some(FACE_MODEL_URL),
        bundled_model_dir().as_deref(),
        Some(Box::new(download_progress)),
    )
    .map_err(|e| StartupError::ModelLoadFailure {
        path: PathBuf::from(FACE_MODEL_NAME),
        reason: e.to_string(),
    })?;

    let base: Box<dyn FaceDetector> = Box::new(
        OnnxYoloDetector::new(&model_path, options.confidence).map_err(|e| {
            StartupError::ModelLoadFailure {
                path: model_path.clone(),
                reason: e.to_string(),
            }
        })?,
    );

    if options.skip_frames > 1 {
        let skipping = SkipFrameDetector::new(base, options.skip_frames)
            .map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
        Ok(Box::new(skipping))
    } else {
        Ok(base)
    }
}

fn build_extractor(explicit: Option<&Path>) -> Result<Box<dyn LandmarkExtractor>, StartupError> {
    let model_path = match explicit {
        Some(path) => path.to_path_buf(),
        None => model_resolver::resolve(
            LANDMARK_MODEL_NAME,
            None,
            bundled_model_dir().as_deref(),
            None,
        )
        .map_err(|e| StartupError::ModelLoadFailure {
            path: PathBuf::from(LANDMARK_MODEL_NAME),
            reason: e.to_string(),
        })?,
    };

    let extractor = OnnxLandmarkExtractor::new(&model_path, DEFAULT_CROP_MARGIN).map_err(|e| {
        StartupError::ModelLoadFailure {
            path: model_path.clone(),
            reason: e.to_string(),
        }
    })?;
    Ok(Box::new(extractor))
}

fn build_notifier(sound: bool) -> Box<dyn AlertNotifier> {
    if !sound {
        return Box::new(NullAlertNotifier);
    }
    Box::new(ThreadedAlertNotifier::new(alert_sound(), Tone::default()))
}

/// Platform tone outputs chained in preference order, ending at the bell.
fn alert_sound() -> Box<dyn AlertSound> {
    FfmpegTonePlayer::platform_outputs().into_iter().rev().fold(
        Box::new(TerminalBell::stderr()) as Box<dyn AlertSound>,
        |fallback, player| Box::new(FallbackAlertSound::new(Box::new(player), fallback)),
    )
}

/// `models/` next to the executable, for pre-packaged installs.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

/// Raises `cancelled` when a line reading `q` arrives on stdin.
fn spawn_quit_listener(cancelled: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if is_quit_command(&line) {
                cancelled.store(true, Ordering::Relaxed);
                break;
            }
        }
    });
}

fn is_quit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("q")
}

fn exit_code_for_summary(summary: &RunSummary) -> i32 {
    match summary.end_reason {
        EndReason::SourceFailed(_) => EXIT_DEVICE,
        EndReason::EndOfStream | EndReason::Cancelled | EndReason::FrameLimit => EXIT_OK,
    }
}

fn exit_code_for_error(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<StartupError>() {
        Some(StartupError::DeviceUnavailable { .. }) => EXIT_DEVICE,
        Some(StartupError::ModelLoadFailure { .. }) => EXIT_MODEL,
        Some(StartupError::InvalidConfig(_)) | None => EXIT_FAILURE,
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["drowsiguard"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_come_from_settings() {
        let options = Options::merge(&parse(&[]), &Settings::default()).unwrap();
        assert_eq!(options.ear_threshold, 0.25);
        assert_eq!(options.consec_frames, 48);
        assert_eq!(options.face_selection, FaceSelection::Largest);
        assert!(options.sound);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_flags_override_settings() {
        let settings = Settings {
            ear_threshold: 0.3,
            face_selection: "last".to_string(),
            ..Settings::default()
        };
        let cli = parse(&[
            "--ear-threshold",
            "0.2",
            "--face-selection",
            "first",
            "--no-sound",
        ]);
        let options = Options::merge(&cli, &settings).unwrap();
        assert_eq!(options.ear_threshold, 0.2);
        assert_eq!(options.face_selection, FaceSelection::First);
        assert!(!options.sound);
    }

    #[test]
    fn test_bad_selection_in_settings_is_invalid_config() {
        let settings = Settings {
            face_selection: "tallest".to_string(),
            ..Settings::default()
        };
        let err = Options::merge(&parse(&[]), &settings).unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_FAILURE);
    }

    #[test]
    fn test_camera_and_input_conflict() {
        let result = Cli::try_parse_from(["drowsiguard", "--camera", "1", "--input", "a.mp4"]);
        assert!(result.is_err());
    }

    #[rstest]
    #[case(&["--ear-threshold", "0"])]
    #[case(&["--ear-threshold", "1.5"])]
    #[case(&["--consec-frames", "0"])]
    #[case(&["--closed-seconds", "0"])]
    #[case(&["--closed-seconds", "1e300"])]
    #[case(&["--closed-seconds", "inf"])]
    #[case(&["--confidence", "2"])]
    #[case(&["--skip-frames", "0"])]
    fn test_validate_rejects(#[case] args: &[&str]) {
        let options = Options::merge(&parse(args), &Settings::default()).unwrap();
        let err = options.validate().unwrap_err();
        assert!(matches!(err, StartupError::InvalidConfig(_)));
    }

    #[test]
    fn test_oversized_closed_seconds_from_settings_is_invalid_config() {
        let settings = Settings {
            closed_seconds: Some(1e300),
            ..Settings::default()
        };
        let options = Options::merge(&parse(&[]), &settings).unwrap();
        assert!(matches!(
            options.monitor_config(30.0),
            Err(StartupError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_closed_seconds_uses_source_fps() {
        let options = Options::merge(&parse(&["--closed-seconds", "2"]), &Settings::default())
            .unwrap();
        assert_eq!(options.monitor_config(15.0).unwrap().consec_frames, 30);
        assert_eq!(options.monitor_config(0.0).unwrap().consec_frames, 60);
    }

    #[test]
    fn test_consec_frames_used_without_duration() {
        let options =
            Options::merge(&parse(&["--consec-frames", "10"]), &Settings::default()).unwrap();
        assert_eq!(options.monitor_config(60.0).unwrap().consec_frames, 10);
    }

    #[rstest]
    #[case("q", true)]
    #[case(" Q \n", true)]
    #[case("quit", false)]
    #[case("", false)]
    fn test_quit_command(#[case] line: &str, #[case] expected: bool) {
        assert_eq!(is_quit_command(line), expected);
    }

    #[rstest]
    #[case(EndReason::EndOfStream, EXIT_OK)]
    #[case(EndReason::Cancelled, EXIT_OK)]
    #[case(EndReason::FrameLimit, EXIT_OK)]
    #[case(EndReason::SourceFailed("gone".into()), EXIT_DEVICE)]
    fn test_exit_code_for_summary(#[case] end_reason: EndReason, #[case] expected: i32) {
        let summary = RunSummary {
            frames_processed: 0,
            frames_with_face: 0,
            skipped_frames: 0,
            alarms_raised: 0,
            end_reason,
        };
        assert_eq!(exit_code_for_summary(&summary), expected);
    }

    #[test]
    fn test_exit_codes_for_startup_errors() {
        let device = StartupError::DeviceUnavailable {
            source_name: "camera 0".into(),
            reason: "busy".into(),
        };
        let model = StartupError::ModelLoadFailure {
            path: PathBuf::from("m.onnx"),
            reason: "missing".into(),
        };
        assert_eq!(exit_code_for_error(&device), EXIT_DEVICE);
        assert_eq!(exit_code_for_error(&model), EXIT_MODEL);

        let io: Box<dyn std::error::Error> = "disk full".into();
        assert_eq!(exit_code_for_error(io.as_ref()), EXIT_FAILURE);
    }

    #[test]
    fn test_options_roundtrip_through_settings() {
        let cli = parse(&["--closed-seconds", "1.5", "--skip-frames", "2"]);
        let options = Options::merge(&cli, &Settings::default()).unwrap();
        let restored = Options::merge(&parse(&[]), &options.to_settings()).unwrap();
        assert_eq!(restored, options);
    }
}
