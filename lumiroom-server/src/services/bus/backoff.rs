use std::time::Duration;

use crate::configs::Reconnect;

/// Bounded exponential backoff, `first × factor^attempt` capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub first: Duration,
    pub max: Duration,
    pub factor: f64,
    /// Attempts before a client gives up.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            first: Duration::from_secs(1),
            max: Duration::from_secs(60),
            factor: 2.0,
            max_attempts: 10,
        }
    }
}

impl From<&Reconnect> for BackoffPolicy {
    fn from(reconnect: &Reconnect) -> Self {
        Self {
            first: Duration::from_millis(reconnect.first_ms),
            max: Duration::from_millis(reconnect.max_ms),
            factor: reconnect.factor,
            max_attempts: reconnect.max_attempts,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (0-indexed), `None` once the
    /// attempts are exhausted.
    pub fn next(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }

        let exponent = attempt.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exponent);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            Some(self.max)
        } else {
            Some(Duration::from_secs_f64(secs))
        }
    }
}
