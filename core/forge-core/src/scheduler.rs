//! Polling Scheduler: fixed-interval conversation refresh while authenticated.
//!
//! Two states. `Idle → Active` asks for an immediate refresh and arms the
//! interval timer; `Active → Idle` disarms it. The scheduler owns no thread:
//! the caller supplies `now` and asks whether a tick is due, which keeps the
//! lifecycle deterministic and lets tests advance time by hand.
//!
//! Missed ticks are coalesced: if the caller wakes late by several intervals,
//! a single refresh fires and the next tick is realigned to the cadence.

use std::time::{Duration, Instant};

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Active { next_due: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTransition {
    /// Became active; the caller should refresh immediately.
    Activated,
    Deactivated,
    Unchanged,
}

#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    state: PollState,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            state: PollState::Idle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, PollState::Active { .. })
    }

    /// Aligns the scheduler with the authentication state.
    pub fn sync(&mut self, authenticated: bool, now: Instant) -> PollTransition {
        match (self.state, authenticated) {
            (PollState::Idle, true) => {
                self.state = PollState::Active {
                    next_due: now + self.interval,
                };
                debug!(interval_ms = self.interval.as_millis() as u64, "Polling activated");
                PollTransition::Activated
            }
            (PollState::Active { .. }, false) => {
                self.cancel();
                PollTransition::Deactivated
            }
            _ => PollTransition::Unchanged,
        }
    }

    /// Returns true when a refresh is due and re-arms the timer.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        let PollState::Active { next_due } = self.state else {
            return false;
        };
        if now < next_due {
            return false;
        }

        // Missed ticks collapse into this one; the next slot stays on the grid.
        let interval = self.interval.as_nanos().max(1);
        let slots = now.duration_since(next_due).as_nanos() / interval + 1;
        let next = u32::try_from(slots)
            .ok()
            .and_then(|slots| self.interval.checked_mul(slots))
            .and_then(|offset| next_due.checked_add(offset))
            .unwrap_or(now + self.interval);
        self.state = PollState::Active { next_due: next };
        true
    }

    /// Disarms the timer. Returns false if it was already idle.
    pub fn cancel(&mut self) -> bool {
        if self.is_active() {
            self.state = PollState::Idle;
            debug!("Polling cancelled");
            true
        } else {
            false
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            PollState::Active { next_due } => Some(next_due),
            PollState::Idle => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(15_000);

    #[test]
    fn starts_idle_and_never_due() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        let start = Instant::now();
        assert_eq!(scheduler.state(), PollState::Idle);
        assert!(!scheduler.poll_due(start + INTERVAL * 10));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn activation_requests_immediate_refresh_and_arms_interval() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        let start = Instant::now();

        assert_eq!(scheduler.sync(true, start), PollTransition::Activated);
        assert_eq!(scheduler.next_deadline(), Some(start + INTERVAL));
        assert!(!scheduler.poll_due(start + INTERVAL - Duration::from_millis(1)));
        assert!(scheduler.poll_due(start + INTERVAL));
        assert!(!scheduler.poll_due(start + INTERVAL));
        assert!(scheduler.poll_due(start + INTERVAL * 2));
    }

    #[test]
    fn staying_authenticated_is_unchanged() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        let start = Instant::now();
        scheduler.sync(true, start);
        assert_eq!(scheduler.sync(true, start + INTERVAL), PollTransition::Unchanged);
        assert_eq!(scheduler.next_deadline(), Some(start + INTERVAL));
    }

    #[test]
    fn logout_stops_polling() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        let start = Instant::now();
        scheduler.sync(true, start);

        assert_eq!(scheduler.sync(false, start + Duration::from_secs(1)), PollTransition::Deactivated);
        assert!(!scheduler.poll_due(start + INTERVAL * 3));
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn cancel_twice_is_safe() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        scheduler.sync(true, Instant::now());
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        assert_eq!(scheduler.state(), PollState::Idle);
    }

    #[test]
    fn late_wakeup_fires_once_and_realigns() {
        let mut scheduler = PollScheduler::new(INTERVAL);
        let start = Instant::now();
        scheduler.sync(true, start);

        let late = start + INTERVAL * 3 + Duration::from_millis(500);
        assert!(scheduler.poll_due(late));
        assert!(!scheduler.poll_due(late));
        assert_eq!(scheduler.next_deadline(), Some(start + INTERVAL * 4));
    }

    #[test]
    fn long_suspend_with_tiny_interval_realigns_in_one_step() {
        let interval = Duration::from_millis(1);
        let mut scheduler = PollScheduler::new(interval);
        let start = Instant::now();
        scheduler.sync(true, start);

        let suspend = Duration::from_secs(10 * 24 * 60 * 60);
        let resumed = start + interval + suspend + Duration::from_micros(250);
        assert!(scheduler.poll_due(resumed));
        assert_eq!(
            scheduler.next_deadline(),
            Some(start + interval + suspend + interval)
        );
        assert!(!scheduler.poll_due(resumed));
    }
}
