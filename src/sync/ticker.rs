use std::time::{Duration, Instant};

/// Fixed-interval deadline for one periodic activity.
///
/// A ticker can be suspended while its activity is busy; it then never comes due
/// until [`resume_after`](Self::resume_after) schedules it again.
pub struct Ticker {
    interval: Duration,
    next_due: Option<Instant>,
}

impl Ticker {
    /// First tick one interval after `now`
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            next_due: Some(now + interval),
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.map_or(false, |due| now >= due)
    }

    #[cfg(test)]
    pub fn is_suspended(&self) -> bool {
        self.next_due.is_none()
    }

    /// Advance past a tick that just ran.
    pub fn fire(&mut self, now: Instant) {
        let Some(due) = self.next_due else {
            return;
        };
        let next = due + self.interval;
        // far behind: resync instead of bursting through missed ticks
        self.next_due = Some(if now > next + self.interval * 3 {
            now + self.interval
        } else {
            next.max(now)
        });
    }

    pub fn suspend(&mut self) {
        self.next_due = None;
    }

    /// Next tick one full interval from `now`
    pub fn resume_after(&mut self, now: Instant) {
        self.next_due = Some(now + self.interval);
    }

    /// Time left before the next tick, `None` while suspended
    pub fn time_until(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }
}
