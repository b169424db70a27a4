pub mod alarm_snapshots;
pub mod bitmap_font;
pub mod frame_sink;
pub mod overlay;
