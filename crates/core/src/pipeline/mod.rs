pub mod errors;
pub mod monitor_drowsiness_use_case;
pub mod pipeline_logger;
