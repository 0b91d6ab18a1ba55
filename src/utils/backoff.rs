//! Bounded exponential backoff for websocket reconnects.

use std::time::Duration;

use crate::config::StreamSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    pub min_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
    pub max_attempts: u32,
}

impl Backoff {
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            min_delay: Duration::from_millis(settings.min_reconnect_delay_ms),
            max_delay: Duration::from_millis(settings.max_reconnect_delay_ms),
            factor: settings.reconnect_backoff_factor,
            max_attempts: settings.max_reconnect_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (1-indexed).
    ///
    /// `min_delay * factor^(attempt - 1)`, capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(64) as i32;
        let ms = self.min_delay.as_millis() as f64 * self.factor.max(1.0).powi(exp);
        let capped = ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backoff() -> Backoff {
        Backoff {
            min_delay: Duration::from_millis(1_000),
            max_delay: Duration::from_millis(30_000),
            factor: 1.3,
            max_attempts: 5,
        }
    }

    #[test]
    fn test_delay_grows_by_factor() {
        let b = backoff();
        assert_eq!(b.delay(1), Duration::from_millis(1_000));
        assert_eq!(b.delay(2), Duration::from_millis(1_300));
        assert_eq!(b.delay(3), Duration::from_millis(1_690));
    }

    #[test]
    fn test_delay_is_capped() {
        let b = backoff();
        assert_eq!(b.delay(60), Duration::from_millis(30_000));
    }

    #[test]
    fn test_exhausted_after_max_attempts() {
        let b = backoff();
        assert!(!b.exhausted(5));
        assert!(b.exhausted(6));
    }
}
