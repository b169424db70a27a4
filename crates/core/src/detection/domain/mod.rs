pub mod face_detector;
pub mod face_selector;
pub mod face_shape;
pub mod landmark_extractor;
