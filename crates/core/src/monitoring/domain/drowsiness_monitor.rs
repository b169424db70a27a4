//! Debounced eye-closure state machine.
//!
//! One average EAR value in, one transition out. The alarm starts once the
//! eyes have been below threshold for `consec_frames` consecutive readings
//! and stops on the first reading at or above threshold. Blinks shorter
//! than the debounce window never reach the alarm.

use std::time::Duration;

use thiserror::Error;

use crate::shared::constants::{ASSUMED_FPS, DEFAULT_CONSEC_FRAMES, DEFAULT_EAR_THRESHOLD};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorConfigError {
    #[error("EAR threshold must be between 0 and 1 (exclusive), got {0}")]
    EarThresholdOutOfRange(f64),
    #[error("consecutive frame threshold must be at least 1")]
    ZeroFrames,
    #[error("closure duration must be positive, got {0:?}")]
    NonPositiveDuration(Duration),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MonitorConfig {
    pub ear_threshold: f64,
    pub consec_frames: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            consec_frames: DEFAULT_CONSEC_FRAMES,
        }
    }
}

impl MonitorConfig {
    pub fn new(ear_threshold: f64, consec_frames: usize) -> Result<Self, MonitorConfigError> {
        let config = Self {
            ear_threshold,
            consec_frames,
        };
        config.validate()?;
        Ok(config)
    }

    /// Derives the frame count from a closure duration and the capture rate.
    ///
    /// `fps <= 0` (rate unknown) assumes 30 fps. The count is rounded up so
    /// the alarm never fires before `closed_for` has elapsed.
    pub fn from_duration(
        ear_threshold: f64,
        closed_for: Duration,
        fps: f64,
    ) -> Result<Self, MonitorConfigError> {
        if closed_for.is_zero() {
            return Err(MonitorConfigError::NonPositiveDuration(closed_for));
        }
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            ASSUMED_FPS
        };
        let frames = (closed_for.as_secs_f64() * fps - 1e-9).ceil().max(1.0) as usize;
        Self::new(ear_threshold, frames)
    }

    pub fn validate(&self) -> Result<(), MonitorConfigError> {
        if !(self.ear_threshold > 0.0 && self.ear_threshold < 1.0) {
            return Err(MonitorConfigError::EarThresholdOutOfRange(
                self.ear_threshold,
            ));
        }
        if self.consec_frames == 0 {
            return Err(MonitorConfigError::ZeroFrames);
        }
        Ok(())
    }

    /// Wall-clock closure time the frame count corresponds to at `fps`.
    pub fn closure_duration(&self, fps: f64) -> Option<Duration> {
        (fps.is_finite() && fps > 0.0)
            .then(|| Duration::from_secs_f64(self.consec_frames as f64 / fps))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertStatus {
    Awake,
    Alerting,
}

/// Edge-triggered alarm notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmEvent {
    /// Awake -> Alerting. Fires once per continuous closure.
    Start,
    /// Alerting -> Awake.
    Stop,
}

/// Temporal state carried between frames.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorState {
    consecutive_low_frames: usize,
    alarm_active: bool,
}

impl MonitorState {
    pub const fn initial() -> Self {
        Self {
            consecutive_low_frames: 0,
            alarm_active: false,
        }
    }

    pub fn consecutive_low_frames(&self) -> usize {
        self.consecutive_low_frames
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm_active
    }

    pub fn status(&self) -> AlertStatus {
        if self.alarm_active {
            AlertStatus::Alerting
        } else {
            AlertStatus::Awake
        }
    }

    /// Pure transition for one average EAR reading.
    pub fn advance(self, ear: f64, config: &MonitorConfig) -> (MonitorState, Option<AlarmEvent>) {
        if ear < config.ear_threshold {
            let consecutive_low_frames = self.consecutive_low_frames.saturating_add(1);
            if consecutive_low_frames >= config.consec_frames {
                let event = (!self.alarm_active).then_some(AlarmEvent::Start);
                let next = MonitorState {
                    consecutive_low_frames,
                    alarm_active: true,
                };
                return (next, event);
            }
            let next = MonitorState {
                consecutive_low_frames,
                alarm_active: self.alarm_active,
            };
            (next, None)
        } else {
            let event = self.alarm_active.then_some(AlarmEvent::Stop);
            (MonitorState::initial(), event)
        }
    }
}

/// Result of feeding one reading to the monitor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observation {
    pub ear: f64,
    pub state: MonitorState,
    pub event: Option<AlarmEvent>,
}

/// Owns a [`MonitorState`] and applies readings to it in order.
///
/// Each instance is independent; nothing is shared between monitors.
#[derive(Clone, Debug)]
pub struct DrowsinessMonitor {
    config: MonitorConfig,
    state: MonitorState,
}

impl DrowsinessMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            state: MonitorState::initial(),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Applies one average EAR reading.
    ///
    /// Non-finite readings carry no information and leave the state as is.
    pub fn observe(&mut self, ear: f64) -> Observation {
        if !ear.is_finite() {
            return Observation {
                ear,
                state: self.state,
                event: None,
            };
        }
        let (next, event) = self.state.advance(ear, &self.config);
        self.state = next;
        Observation {
            ear,
            state: next,
            event,
        }
    }

    pub fn reset(&mut self) {
        self.state = MonitorState::initial();
    }
}

impl Default for DrowsinessMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
