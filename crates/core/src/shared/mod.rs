pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod point;
pub mod region;
pub mod video_metadata;
