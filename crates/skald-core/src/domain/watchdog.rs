//! Crash-restart policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When and how often a crashed server is relaunched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchdogPolicy {
    /// Restart automatically after a crash.
    pub enabled: bool,
    /// Crashes tolerated inside one cooldown window before giving up.
    pub max_restarts: u32,
    /// Delay before the first restart.
    pub restart_delay_ms: u64,
    /// A crash-free period this long resets the crash counter.
    pub cooldown_period_ms: u64,
    /// Factor applied to the delay for each consecutive crash.
    pub backoff_multiplier: f64,
}

impl Default for WatchdogPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_restarts: 5,
            restart_delay_ms: 5_000,
            cooldown_period_ms: 300_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl WatchdogPolicy {
    /// Delay before restart number `consecutive_crashes` (1-based).
    ///
    /// `restart_delay_ms * backoff_multiplier^(consecutive_crashes - 1)`.
    pub fn delay_for(&self, consecutive_crashes: u32) -> Duration {
        let exponent = consecutive_crashes.saturating_sub(1);
        let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
        #[allow(clippy::cast_precision_loss)]
        let base = self.restart_delay_ms as f64;
        let millis = base * self.backoff_multiplier.max(0.0).powi(exponent);
        Duration::try_from_secs_f64(millis / 1000.0).unwrap_or(Duration::MAX)
    }

    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_period_ms)
    }
}
