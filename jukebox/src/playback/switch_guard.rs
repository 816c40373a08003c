use std::time::{Duration, Instant};

pub const SWITCH_TIMEOUT: Duration = Duration::from_millis(5000);

/// Rejects overlapping playlist switches and bounds how long one may hang.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SwitchGuard {
    started_at: Option<Instant>,
}

impl SwitchGuard {
    pub fn is_switching(&self) -> bool {
        self.started_at.is_some()
    }

    /// `false` if a switch is already in flight.
    pub fn try_begin(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    pub fn finish(&mut self) {
        self.started_at = None;
    }

    pub fn has_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.started_at
            .is_some_and(|start| now.saturating_duration_since(start) > timeout)
    }
}
