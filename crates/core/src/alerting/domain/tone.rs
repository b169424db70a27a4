use std::f64::consts::TAU;
use std::time::Duration;

use crate::alerting::domain::audio_segment::AudioSegment;
use crate::shared::constants::{ALERT_TONE_HZ, ALERT_TONE_MS};

/// Peak amplitude of a rendered tone.
const AMPLITUDE: f64 = 0.5;

/// Linear fade at each end, to avoid clicks.
const FADE: Duration = Duration::from_millis(5);

/// A pure sine beep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration: Duration,
}

impl Tone {
    pub fn new(frequency_hz: f64, duration: Duration) -> Self {
        Self {
            frequency_hz,
            duration,
        }
    }

    /// Mono PCM rendering at `sample_rate`.
    pub fn render(&self, sample_rate: u32) -> AudioSegment {
        let rate = sample_rate as f64;
        let n = (self.duration.as_secs_f64() * rate).round() as usize;
        let fade = ((FADE.as_secs_f64() * rate) as usize).min(n / 2).max(1);

        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / rate;
                let edge = i.min(n - 1 - i);
                let envelope = (edge as f64 / fade as f64).min(1.0);
                (AMPLITUDE * envelope * (TAU * self.frequency_hz * t).sin()) as f32
            })
            .collect();

        AudioSegment::new(samples, sample_rate)
    }
}

impl Default for Tone {
    fn default() -> Self {
        Self::new(ALERT_TONE_HZ, Duration::from_millis(ALERT_TONE_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_2khz_half_second() {
        let tone = Tone::default();
        assert_relative_eq!(tone.frequency_hz, 2000.0);
        assert_eq!(tone.duration, Duration::from_millis(500));
    }

    #[test]
    fn test_render_length_matches_duration() {
        let seg = Tone::default().render(44100);
        assert_eq!(seg.samples().len(), 22050);
        assert_eq!(seg.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_render_stays_within_amplitude() {
        let seg = Tone::new(440.0, Duration::from_millis(100)).render(8000);
        let peak = seg.samples().iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= 0.5 + 1e-6);
        assert!(peak > 0.45);
    }

    #[test]
    fn test_render_fades_in_and_out() {
        let seg = Tone::new(1000.0, Duration::from_millis(100)).render(8000);
        let samples = seg.samples();
        assert_eq!(samples[0], 0.0);
        assert!(samples[samples.len() - 1].abs() < 0.05);
    }

    #[test]
    fn test_render_zero_duration_is_empty() {
        let seg = Tone::new(1000.0, Duration::ZERO).render(8000);
        assert!(seg.samples().is_empty());
    }

    #[test]
    fn test_render_zero_crossings_track_frequency() {
        // 250 Hz for one second crosses zero ~500 times
        let seg = Tone::new(250.0, Duration::from_secs(1)).render(8000);
        let crossings = seg
            .samples()
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count();
        assert!((495..=505).contains(&crossings), "crossings = {crossings}");
    }
}
