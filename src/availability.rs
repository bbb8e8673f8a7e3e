use std::time::Duration;
use tokio::time::Instant;

// Deadline used when `now + duration` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Timed unavailability flag used to simulate a crashed or partitioned
/// replica. Stored data is never touched by it.
#[derive(Debug, Clone, Default)]
pub struct AvailabilitySwitch {
    unavailable_until: Option<Instant>,
}

impl AvailabilitySwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Become unavailable for `duration` from now, replacing any window in
    /// progress. Durations past the end of the clock are capped.
    pub fn crash(&mut self, duration: Duration) {
        let now = Instant::now();
        let until = now
            .checked_add(duration)
            .or_else(|| now.checked_add(FAR_FUTURE.min(duration)))
            .unwrap_or(now);
        self.unavailable_until = Some(until);
    }

    /// End the current window early
    pub fn recover(&mut self) {
        self.unavailable_until = None;
    }

    /// Time left in the current window, `None` when available
    pub fn remaining(&self) -> Option<Duration> {
        let until = self.unavailable_until?;
        let now = Instant::now();
        (until > now).then(|| until - now)
    }

    pub fn is_available(&self) -> bool {
        self.remaining().is_none()
    }
}
