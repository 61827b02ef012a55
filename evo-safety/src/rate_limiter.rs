//! Rate limiter (§4.11): per-minute/hour/day windows on mutation
//! counts, token-bucket style.

use evo_core::Timestamp;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_per_minute: u32,
    pub max_per_hour: u32,
    pub max_per_day: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self { max_per_minute: 10, max_per_hour: 100, max_per_day: 500 }
    }
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    events: VecDeque<Timestamp>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self { config, events: VecDeque::new() }
    }

    fn prune(&mut self, now: Timestamp) {
        while let Some(front) = self.events.front() {
            if front.hours_since(now) > 24.0 {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn count_within(&self, now: Timestamp, hours: f64) -> u32 {
        self.events.iter().filter(|e| e.hours_since(now) <= hours).count() as u32
    }

    /// Returns whether a new mutation may proceed without exceeding any
    /// window, without recording it.
    pub fn check(&mut self) -> bool {
        let now = Timestamp::now();
        self.prune(now);
        self.count_within(now, 1.0 / 60.0) < self.config.max_per_minute
            && self.count_within(now, 1.0) < self.config.max_per_hour
            && self.count_within(now, 24.0) < self.config.max_per_day
    }

    /// Records an attempted mutation. Callers should `check()` first;
    /// this always records, mirroring a token-bucket's "spend" step.
    pub fn record(&mut self) {
        self.events.push_back(Timestamp::now());
    }

    /// `check()` then `record()` if admitted.
    pub fn try_acquire(&mut self) -> bool {
        if self.check() {
            self.record();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_per_minute_cap() {
        let config = RateLimiterConfig { max_per_minute: 2, max_per_hour: 100, max_per_day: 100 };
        let mut limiter = RateLimiter::new(config);
        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn hourly_cap_is_independent_of_minute_cap() {
        let config = RateLimiterConfig { max_per_minute: 1000, max_per_hour: 1, max_per_day: 1000 };
        let mut limiter = RateLimiter::new(config);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }
}
