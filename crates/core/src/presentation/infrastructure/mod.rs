pub mod recording_frame_sink;
