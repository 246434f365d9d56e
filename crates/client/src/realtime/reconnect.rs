use std::time::Duration;

use crate::config::WidgetConfig;

/// Bounded, fixed-interval reconnect scheduling.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Consecutive failures tolerated before giving up.
    pub max_attempts: u32,
    pub delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            attempts: 0,
        }
    }

    pub fn from_config(config: &WidgetConfig) -> Self {
        Self::new(config.max_reconnect_attempts, config.reconnect_delay)
    }

    /// Called after a successful open.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Count a failure and return the delay before the next attempt, or
    /// `None` once the bound is exceeded.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        (self.attempts <= self.max_attempts).then_some(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gives_up_after_max_attempts() {
        let mut policy = ReconnectPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(2)));
        assert_eq!(policy.next_delay(), None);
        assert_eq!(policy.attempts(), 4);
    }

    #[test]
    fn reset_restores_the_budget() {
        let mut policy = ReconnectPolicy::new(1, Duration::from_millis(500));
        assert!(policy.next_delay().is_some());
        policy.reset();
        assert!(policy.next_delay().is_some());
        assert!(policy.next_delay().is_none());
    }

    #[test]
    fn zero_attempts_never_retries() {
        let mut policy = ReconnectPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.next_delay(), None);
    }
}
