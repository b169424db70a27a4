pub mod ffmpeg_tone_player;
pub mod terminal_bell;
pub mod threaded_alert_notifier;
