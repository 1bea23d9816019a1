//! Crash counting inside a sliding cooldown window.

use std::time::Duration;

use skald_core::WatchdogPolicy;
use tokio::time::Instant;

/// What to do about a crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    /// Relaunch after `delay`. `attempt` is 1-based.
    Restart { attempt: u32, delay: Duration },
    /// The policy is exhausted; stop retrying.
    GiveUp { crashes: u32 },
}

/// Consecutive-crash counter.
///
/// A crash more than `cooldown_period_ms` after the previous one starts a
/// new count.
#[derive(Debug, Default, Clone)]
pub struct RestartTracker {
    consecutive: u32,
    last_crash: Option<Instant>,
}

impl RestartTracker {
    pub fn record_crash(&mut self, now: Instant, policy: &WatchdogPolicy) -> RestartDecision {
        if let Some(last) = self.last_crash {
            if now.saturating_duration_since(last) > policy.cooldown() {
                self.consecutive = 0;
            }
        }
        self.consecutive = self.consecutive.saturating_add(1);
        self.last_crash = Some(now);

        if self.consecutive > policy.max_restarts {
            RestartDecision::GiveUp {
                crashes: self.consecutive,
            }
        } else {
            RestartDecision::Restart {
                attempt: self.consecutive,
                delay: policy.delay_for(self.consecutive),
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub const fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_restarts: u32) -> WatchdogPolicy {
        WatchdogPolicy {
            enabled: true,
            max_restarts,
            restart_delay_ms: 100,
            cooldown_period_ms: 60_000,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn gives_up_after_max_restarts_within_window() {
        let policy = policy(2);
        let mut tracker = RestartTracker::default();
        let t0 = Instant::now();

        assert_eq!(
            tracker.record_crash(t0, &policy),
            RestartDecision::Restart {
                attempt: 1,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(
            tracker.record_crash(t0 + Duration::from_secs(3), &policy),
            RestartDecision::Restart {
                attempt: 2,
                delay: Duration::from_millis(200)
            }
        );
        assert_eq!(
            tracker.record_crash(t0 + Duration::from_secs(6), &policy),
            RestartDecision::GiveUp { crashes: 3 }
        );
    }

    #[test]
    fn quiet_period_resets_the_count() {
        let policy = policy(1);
        let mut tracker = RestartTracker::default();
        let t0 = Instant::now();

        tracker.record_crash(t0, &policy);
        let decision = tracker.record_crash(t0 + Duration::from_secs(61), &policy);
        assert!(matches!(decision, RestartDecision::Restart { attempt: 1, .. }));
        assert_eq!(tracker.consecutive(), 1);
    }

    #[test]
    fn window_slides_from_the_last_crash() {
        let policy = policy(2);
        let mut tracker = RestartTracker::default();
        let t0 = Instant::now();

        // Each crash is within 60s of the previous one, so none resets
        tracker.record_crash(t0, &policy);
        tracker.record_crash(t0 + Duration::from_secs(50), &policy);
        let decision = tracker.record_crash(t0 + Duration::from_secs(100), &policy);
        assert_eq!(decision, RestartDecision::GiveUp { crashes: 3 });
    }

    #[test]
    fn zero_max_restarts_never_restarts() {
        let mut tracker = RestartTracker::default();
        assert_eq!(
            tracker.record_crash(Instant::now(), &policy(0)),
            RestartDecision::GiveUp { crashes: 1 }
        );
        tracker.reset();
        assert_eq!(tracker.consecutive(), 0);
    }
}
