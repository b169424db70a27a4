use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::alerting::domain::alert_notifier::AlertNotifier;
use crate::alerting::domain::alert_sound::AlertSound;
use crate::alerting::domain::tone::Tone;
use crate::monitoring::domain::drowsiness_monitor::AlarmEvent;

/// At most one tone may wait while another is playing.
const QUEUE_CAPACITY: usize = 1;

/// Plays the alert tone on a worker thread when an alarm starts.
///
/// `notify` never blocks: if the worker is busy and a tone is already queued,
/// the request is dropped.
pub struct ThreadedAlertNotifier {
    tx: Option<Sender<Tone>>,
    handle: Option<JoinHandle<Box<dyn AlertSound>>>,
    tone: Tone,
    dropped: usize,
}

impl ThreadedAlertNotifier {
    pub fn new(sound: Box<dyn AlertSound>, tone: Tone) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<Tone>(QUEUE_CAPACITY);
        let handle = spawn_player(sound, rx);
        Self {
            tx: Some(tx),
            handle: Some(handle),
            tone,
            dropped: 0,
        }
    }

    /// Alerts skipped because the worker was still busy.
    pub fn dropped_count(&self) -> usize {
        self.dropped
    }

    /// Lets queued tones finish, then stops the worker.
    pub fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Alert worker panicked");
            }
        }
    }
}

impl AlertNotifier for ThreadedAlertNotifier {
    fn notify(&mut self, event: AlarmEvent) {
        if event != AlarmEvent::Start {
            return;
        }
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(self.tone) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::debug!("Alert worker busy; dropping alert");
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Alert worker has stopped; alert not played");
            }
        }
    }
}

impl Drop for ThreadedAlertNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_player(
    mut sound: Box<dyn AlertSound>,
    rx: crossbeam_channel::Receiver<Tone>,
) -> JoinHandle<Box<dyn AlertSound>> {
    std::thread::spawn(move || {
        for tone in rx {
            if let Err(e) = sound.play(&tone) {
                log::warn!("Failed to play alert sound: {e}");
            }
        }
        sound
    })
}
