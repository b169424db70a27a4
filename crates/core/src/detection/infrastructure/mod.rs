pub mod onnx_landmark_extractor;
pub mod onnx_session;
pub mod onnx_yolo_detector;
pub mod skip_frame_detector;
