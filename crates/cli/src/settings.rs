use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use drowsiguard_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use drowsiguard_core::shared::constants::{DEFAULT_CONSEC_FRAMES, DEFAULT_EAR_THRESHOLD};

/// Persisted defaults. Command-line flags take precedence over every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ear_threshold: f64,
    pub consec_frames: usize,
    /// When set, replaces `consec_frames` with a duration at the source rate.
    pub closed_seconds: Option<f64>,
    pub face_selection: String,
    pub confidence: f64,
    pub skip_frames: usize,
    pub sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consec_frames: DEFAULT_CONSEC_FRAMES,
            closed_seconds: None,
            face_selection: "largest".to_string(),
            confidence: DEFAULT_CONFIDENCE,
            skip_frames: 1,
            sound: true,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("DrowsiGuard").join("settings.json"))
    }

    /// Loads the user's settings; a missing or malformed file gives defaults.
    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring malformed settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
    }

    #[rstest]
    #[case("not json")]
    #[case("{\"ear_threshold\": \"low\"}")]
    #[case("42")]
    fn test_malformed_file_gives_defaults(#[case] contents: &str) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, contents).unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_partial_file_fills_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"ear_threshold": 0.2, "sound": false}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.ear_threshold, 0.2);
        assert!(!settings.sound);
        assert_eq!(settings.consec_frames, 48);
        assert_eq!(settings.face_selection, "largest");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            closed_seconds: Some(1.5),
            face_selection: "first".to_string(),
            skip_frames: 3,
            ..Settings::default()
        };

        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }
}
