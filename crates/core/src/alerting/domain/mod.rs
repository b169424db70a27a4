pub mod alert_notifier;
pub mod alert_sound;
pub mod audio_segment;
pub mod tone;
