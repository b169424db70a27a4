pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const FACE_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// 68-point landmark regressor. Not downloadable; must be placed in the
/// model cache directory or passed explicitly.
pub const LANDMARK_MODEL_NAME: &str = "face_landmarks_68.onnx";

/// Average eye aspect ratio below which the eyes count as closed.
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.25;

/// Consecutive closed-eye frames before the alarm starts (~1.6 s at 30 fps).
pub const DEFAULT_CONSEC_FRAMES: usize = 48;

/// Frame rate assumed when a source does not report one.
pub const ASSUMED_FPS: f64 = 30.0;

pub const ALERT_TONE_HZ: f64 = 2000.0;
pub const ALERT_TONE_MS: u64 = 500;
pub const ALERT_SAMPLE_RATE: u32 = 44100;
