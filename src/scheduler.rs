use std::time::Duration;

/// Drives periodic refresh and exposes the countdown shown to readers.
///
/// The countdown is the only clock: a refresh is due exactly when it runs
/// out, so there is one trigger per period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshScheduler {
    period_secs: u64,
    remaining_secs: u64,
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        let period_secs = period.as_secs().max(1);
        Self {
            period_secs,
            remaining_secs: period_secs,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn remaining(&self) -> u64 {
        self.remaining_secs
    }

    /// Advances one second. Returns true when a refresh is due, in which
    /// case the countdown has already restarted.
    pub fn tick(&mut self) -> bool {
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.reset();
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.remaining_secs = self.period_secs;
    }
}
