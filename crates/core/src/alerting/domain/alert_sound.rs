use crate::alerting::domain::tone::Tone;

/// Domain interface for an audible cue.
///
/// `play` may block for the length of the tone; callers that must not stall
/// run it off the frame-processing thread.
pub trait AlertSound: Send {
    fn play(&mut self, tone: &Tone) -> Result<(), Box<dyn std::error::Error>>;
}

/// Tries `primary` first and switches to `fallback` for good after the first
/// failure.
pub struct FallbackAlertSound {
    primary: Box<dyn AlertSound>,
    fallback: Box<dyn AlertSound>,
    primary_failed: bool,
}

impl FallbackAlertSound {
    pub fn new(primary: Box<dyn AlertSound>, fallback: Box<dyn AlertSound>) -> Self {
        Self {
            primary,
            fallback,
            primary_failed: false,
        }
    }
}

impl AlertSound for FallbackAlertSound {
    fn play(&mut self, tone: &Tone) -> Result<(), Box<dyn std::error::Error>> {
        if !self.primary_failed {
            match self.primary.play(tone) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    log::warn!("Alert sound unavailable ({e}); falling back");
                    self.primary_failed = true;
                }
            }
        }
        self.fallback.play(tone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CountingSound {
        plays: Arc<Mutex<usize>>,
        fail: bool,
    }

    impl AlertSound for CountingSound {
        fn play(&mut self, _tone: &Tone) -> Result<(), Box<dyn std::error::Error>> {
            *self.plays.lock().unwrap() += 1;
            if self.fail {
                Err("no device".into())
            } else {
                Ok(())
            }
        }
    }

    fn counting(fail: bool) -> (Box<dyn AlertSound>, Arc<Mutex<usize>>) {
        let plays = Arc::new(Mutex::new(0));
        let sound = CountingSound {
            plays: plays.clone(),
            fail,
        };
        (Box::new(sound), plays)
    }

    #[test]
    fn test_primary_used_while_it_works() {
        let (primary, primary_plays) = counting(false);
        let (fallback, fallback_plays) = counting(false);
        let mut sound = FallbackAlertSound::new(primary, fallback);

        sound.play(&Tone::default()).unwrap();
        sound.play(&Tone::default()).unwrap();

        assert_eq!(*primary_plays.lock().unwrap(), 2);
        assert_eq!(*fallback_plays.lock().unwrap(), 0);
    }

    #[test]
    fn test_switches_to_fallback_after_failure() {
        let (primary, primary_plays) = counting(true);
        let (fallback, fallback_plays) = counting(false);
        let mut sound = FallbackAlertSound::new(primary, fallback);

        sound.play(&Tone::default()).unwrap();
        sound.play(&Tone::default()).unwrap();

        assert_eq!(*primary_plays.lock().unwrap(), 1);
        assert_eq!(*fallback_plays.lock().unwrap(), 2);
    }

    #[test]
    fn test_both_failing_reports_error() {
        let (primary, _) = counting(true);
        let (fallback, _) = counting(true);
        let mut sound = FallbackAlertSound::new(primary, fallback);
        assert!(sound.play(&Tone::default()).is_err());
    }
}
