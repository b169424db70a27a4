pub mod ffmpeg_capture;
pub mod ffmpeg_writer;
pub mod image_file_writer;
