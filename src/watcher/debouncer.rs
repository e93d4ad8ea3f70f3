//! Optional coalescing of rebuild requests.
//!
//! Editors often produce a burst of events for one save (truncate, write,
//! chmod). With a non-zero quiet period the requests of such a burst are
//! folded into a single rebuild once no new request arrived for that long.

use std::time::{Duration, Instant};

/// Debounces rebuild requests.
#[derive(Debug)]
pub struct Debouncer {
    /// Time of the latest request not yet served.
    pending: Option<Instant>,
    /// How long requests must stop before the rebuild runs.
    duration: Duration,
}

impl Debouncer {
    /// Create a new debouncer with the given duration in milliseconds.
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: None,
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Zero quiet period: every request is served on the spot.
    pub fn is_immediate(&self) -> bool {
        self.duration.is_zero()
    }

    /// Record a rebuild request, resetting the quiet period.
    pub fn record(&mut self) {
        self.pending = Some(Instant::now());
    }

    /// Consume the pending request if it has been quiet long enough.
    pub fn take_ready(&mut self) -> bool {
        match self.pending {
            Some(since) if since.elapsed() >= self.duration => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Consume the pending request regardless of timing.
    pub fn take_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Time left until the pending request is ready, if there is one.
    pub fn time_until_ready(&self) -> Option<Duration> {
        self.pending
            .map(|since| self.duration.saturating_sub(since.elapsed()))
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_debouncer_basic() {
        let mut debouncer = Debouncer::new(50);
        assert!(!debouncer.is_immediate());
        assert!(debouncer.time_until_ready().is_none());

        debouncer.record();

        // Immediately after, nothing should be ready
        assert!(!debouncer.take_ready());
        assert!(debouncer.has_pending());
        assert!(debouncer.time_until_ready().unwrap() <= Duration::from_millis(50));

        sleep(Duration::from_millis(60));

        assert!(debouncer.take_ready());
        assert!(!debouncer.has_pending());
        assert!(!debouncer.take_ready());
    }

    #[test]
    fn test_debouncer_resets_on_new_request() {
        let mut debouncer = Debouncer::new(50);

        debouncer.record();
        sleep(Duration::from_millis(30));

        // Record again - should reset the timer
        debouncer.record();
        sleep(Duration::from_millis(30));

        // 60ms since the first request but only 30ms since the last one
        assert!(!debouncer.take_ready());

        sleep(Duration::from_millis(30));
        assert!(debouncer.take_ready());
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let mut debouncer = Debouncer::new(0);
        assert!(debouncer.is_immediate());

        debouncer.record();
        assert_eq!(debouncer.time_until_ready(), Some(Duration::ZERO));
        assert!(debouncer.take_ready());
    }

    #[test]
    fn test_take_pending_ignores_timing() {
        let mut debouncer = Debouncer::new(10_000);
        assert!(!debouncer.take_pending());

        debouncer.record();
        assert!(debouncer.take_pending());
        assert!(!debouncer.has_pending());
    }
}
