//! Process-wide counters for INFO/STATS (§4.L) — atomic, relaxed
//! ordering, exactly as §5 prescribes for everything but the
//! shutdown flag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct Stats {
    start: Instant,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Stats {
            start: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_accumulate() {
        let stats = Stats::new();
        assert_eq!(stats.total_requests(), 0);
        assert_eq!(stats.total_errors(), 0);
        stats.record_request();
        stats.record_request();
        stats.record_error();
        assert_eq!(stats.total_requests(), 2);
        assert_eq!(stats.total_errors(), 1);
    }
}
