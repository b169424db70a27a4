use std::time::Duration;

/// Mono PCM audio, samples in [-1.0, 1.0].
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Signed 16-bit samples for the PCM_S16LE encoder; out-of-range input
    /// is clipped.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_rate() {
        let seg = AudioSegment::new(vec![0.0; 22050], 44100);
        assert_eq!(seg.duration(), Duration::from_millis(500));
        assert_eq!(seg.len(), 22050);
    }

    #[test]
    fn test_zero_rate_has_no_duration() {
        let seg = AudioSegment::new(vec![0.0; 10], 0);
        assert_eq!(seg.duration(), Duration::ZERO);
    }

    #[test]
    fn test_empty() {
        assert!(AudioSegment::new(Vec::new(), 8000).is_empty());
    }

    #[test]
    fn test_to_i16_scales_and_clips() {
        let seg = AudioSegment::new(vec![0.0, 1.0, -1.0, 2.0, -3.0, 0.5], 8000);
        assert_eq!(
            seg.to_i16(),
            vec![0, i16::MAX, -i16::MAX, i16::MAX, -i16::MAX, 16384]
        );
    }
}
