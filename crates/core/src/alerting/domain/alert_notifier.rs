use crate::monitoring::domain::drowsiness_monitor::AlarmEvent;

/// Receives alarm edges from the monitoring loop.
///
/// Fire-and-forget: implementations must return promptly and never fail the
/// caller.
pub trait AlertNotifier {
    fn notify(&mut self, event: AlarmEvent);
}

/// Discards every event (sound disabled).
pub struct NullAlertNotifier;

impl AlertNotifier for NullAlertNotifier {
    fn notify(&mut self, _event: AlarmEvent) {}
}
