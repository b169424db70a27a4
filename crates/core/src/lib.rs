//! Webcam drowsiness detection: eye aspect ratio over facial landmarks,
//! debounced into edge-triggered alarms.

pub mod alerting;
pub mod detection;
pub mod monitoring;
pub mod pipeline;
pub mod presentation;
pub mod shared;
pub mod video;
