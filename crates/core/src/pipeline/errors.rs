use std::path::PathBuf;

use thiserror::Error;

use crate::monitoring::domain::drowsiness_monitor::MonitorConfigError;
use crate::monitoring::domain::eye_aspect_ratio::EarError;

/// Fatal errors raised before the frame loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("capture device unavailable ({source_name}): {reason}")]
    DeviceUnavailable { source_name: String, reason: String },
    #[error("failed to load model {}: {reason}", path.display())]
    ModelLoadFailure { path: PathBuf, reason: String },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<MonitorConfigError> for StartupError {
    fn from(err: MonitorConfigError) -> Self {
        StartupError::InvalidConfig(err.to_string())
    }
}

/// Recoverable error for a single frame. The loop logs it and moves on.
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error("landmark extraction failed: {0}")]
    Landmarks(String),
    #[error(transparent)]
    Geometry(#[from] EarError),
}
