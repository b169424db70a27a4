pub mod drowsiness_monitor;
pub mod eye_aspect_ratio;
