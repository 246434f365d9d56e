use std::time::Duration;

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

const MIN_PERIOD: Duration = Duration::from_millis(100);

/// Liveness probe timer for one connected socket.
///
/// The first tick fires one full period after creation. Dropping the value
/// clears the timer.
#[derive(Debug)]
pub struct Heartbeat {
    interval: Interval,
}

impl Heartbeat {
    pub fn start(period: Duration) -> Self {
        let period = period.max(MIN_PERIOD);
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    /// Cancel-safe.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let started = Instant::now();
        let mut heartbeat = Heartbeat::start(Duration::from_secs(25));
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(25));
        heartbeat.tick().await;
        assert_eq!(started.elapsed(), Duration::from_secs(50));
    }

    #[test]
    fn zero_period_is_clamped() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        rt.block_on(async {
            let heartbeat = Heartbeat::start(Duration::ZERO);
            assert_eq!(heartbeat.period(), MIN_PERIOD);
        });
    }
}
