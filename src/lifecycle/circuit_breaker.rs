//! Sliding-window circuit breaker for mutation batches
//!
//! Once more than `max_events` batches arrive within `window_ms`, the
//! breaker trips and stays tripped until `reset`. The controller resets it
//! on every navigation.

use instant::Instant;
use std::collections::VecDeque;

use crate::config::DomObservationConfig;

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    max_events: u32,
    window_ms: f64,
    /// Timestamps (ms since `origin`) of batches inside the window
    events: VecDeque<f64>,
    tripped: bool,
    origin: Instant,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&DomObservationConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(max_events: u32, window_ms: f64) -> Self {
        Self {
            max_events,
            window_ms,
            events: VecDeque::new(),
            tripped: false,
            origin: Instant::now(),
        }
    }

    pub fn from_config(config: &DomObservationConfig) -> Self {
        Self::new(config.max_events, config.window_ms)
    }

    /// Record a batch now. Returns whether it may be processed.
    pub fn record(&mut self) -> bool {
        let now_ms = self.origin.elapsed().as_secs_f64() * 1000.0;
        self.record_at(now_ms)
    }

    /// Record a batch at `now_ms`. Returns whether it may be processed.
    pub fn record_at(&mut self, now_ms: f64) -> bool {
        if self.tripped {
            return false;
        }

        while self
            .events
            .front()
            .is_some_and(|t| now_ms - *t >= self.window_ms)
        {
            self.events.pop_front();
        }
        self.events.push_back(now_ms);

        if self.events.len() > self.max_events as usize {
            self.tripped = true;
            self.events.clear();
            log::warn!(
                "more than {} DOM mutation batches within {}ms; DOM tag observation paused until the next navigation",
                self.max_events,
                self.window_ms
            );
            return false;
        }
        true
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }

    /// Close the breaker and forget the window
    pub fn reset(&mut self) {
        self.tripped = false;
        self.events.clear();
    }

    /// Apply new limits. Also resets.
    pub fn reconfigure(&mut self, config: &DomObservationConfig) {
        self.max_events = config.max_events;
        self.window_ms = config.window_ms;
        self.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let mut breaker = CircuitBreaker::new(3, 100.0);
        assert!(breaker.record_at(0.0));
        assert!(breaker.record_at(10.0));
        assert!(breaker.record_at(20.0));
        assert!(!breaker.is_tripped());
    }

    #[test]
    fn test_trips_when_exceeded() {
        let mut breaker = CircuitBreaker::new(3, 100.0);
        for t in [0.0, 10.0, 20.0] {
            assert!(breaker.record_at(t));
        }
        assert!(!breaker.record_at(30.0));
        assert!(breaker.is_tripped());
        // stays open even after the window passes
        assert!(!breaker.record_at(10_000.0));
    }

    #[test]
    fn test_window_slides() {
        let mut breaker = CircuitBreaker::new(2, 100.0);
        assert!(breaker.record_at(0.0));
        assert!(breaker.record_at(50.0));
        assert!(breaker.record_at(100.0));
        assert!(breaker.record_at(160.0));
        assert!(!breaker.is_tripped());
    }

    #[test]
    fn test_reset_closes() {
        let mut breaker = CircuitBreaker::new(1, 100.0);
        assert!(breaker.record_at(0.0));
        assert!(!breaker.record_at(1.0));

        breaker.reset();

        assert!(!breaker.is_tripped());
        assert!(breaker.record_at(2.0));
    }

    #[test]
    fn test_reconfigure() {
        let mut breaker = CircuitBreaker::default();
        breaker.reconfigure(&DomObservationConfig {
            max_events: 0,
            window_ms: 10.0,
        });
        assert!(!breaker.record_at(0.0));
    }

    #[test]
    fn test_record_uses_clock() {
        let mut breaker = CircuitBreaker::new(1, 60_000.0);
        assert!(breaker.record());
        assert!(!breaker.record());
    }
}
