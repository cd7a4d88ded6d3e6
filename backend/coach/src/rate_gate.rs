use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use dealcoach_core::now_ms;

/// Minimum-interval cooldown for analysis invocations.
///
/// The gate is global per process: concurrent sessions share one cooldown
/// clock. Check and update happen in a single atomic step so two triggers
/// racing each other cannot both pass.
pub struct RateGate {
    last_analysis_ms: AtomicI64,
    min_interval_ms: i64,
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_analysis_ms: AtomicI64::new(0),
            min_interval_ms: min_interval.as_millis() as i64,
        }
    }

    /// Atomically claim the gate if the cooldown has elapsed. A successful
    /// claim stamps the clock immediately, closing the check-then-set race.
    pub fn try_acquire(&self) -> bool {
        let now = now_ms();
        self.last_analysis_ms
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                (now - last >= self.min_interval_ms).then_some(now)
            })
            .is_ok()
    }

    /// Re-stamp the clock. Called when an analysis finishes so the cooldown
    /// also covers the call's duration, success or not.
    pub fn stamp(&self) {
        self.last_analysis_ms.store(now_ms(), Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_acquire_passes() {
        let gate = RateGate::new(Duration::from_secs(30));
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_second_acquire_within_interval_blocked() {
        let gate = RateGate::new(Duration::from_secs(30));
        assert!(gate.try_acquire());
        assert!(!gate.try_acquire());
    }

    #[test]
    fn test_zero_interval_always_open() {
        let gate = RateGate::new(Duration::ZERO);
        assert!(gate.try_acquire());
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_only_one_of_many_racing_acquires_wins() {
        use std::sync::Arc;
        let gate = Arc::new(RateGate::new(Duration::from_secs(30)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.try_acquire())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
