use log::debug;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::PacingConfig;

/// Randomized pause between scrape steps so requests do not follow a fixed cadence.
#[derive(Debug, Clone)]
pub struct Pacer {
    min: Duration,
    max: Duration,
}

impl Pacer {
    pub fn new(min: Duration, max: Duration) -> Self {
        // tolerate an inverted range from config
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let (lo, hi) = (self.min.as_millis() as u64, self.max.as_millis() as u64);
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }

    pub async fn pause(&self) {
        let delay = self.next_delay();
        if delay.is_zero() {
            return;
        }
        debug!("Pausing for {:?}", delay);
        sleep(delay).await;
    }
}

impl From<&PacingConfig> for Pacer {
    fn from(cfg: &PacingConfig) -> Self {
        Pacer::new(
            Duration::from_millis(cfg.min_ms),
            Duration::from_millis(cfg.max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_stay_within_bounds() {
        let pacer = Pacer::new(Duration::from_secs(2), Duration::from_secs(5));
        for _ in 0..200 {
            let d = pacer.next_delay();
            assert!(d >= Duration::from_secs(2) && d <= Duration::from_secs(5));
        }
    }

    #[test]
    fn inverted_range_is_normalised() {
        let pacer = Pacer::new(Duration::from_millis(50), Duration::from_millis(10));
        let d = pacer.next_delay();
        assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(50));
    }

    #[test]
    fn disabled_pacer_never_waits() {
        assert_eq!(Pacer::disabled().next_delay(), Duration::ZERO);
    }
}
