//! Slow query monitoring
//!
//! Every repository operation holds a [`QueryTimer`] for its duration. When
//! the timer drops, the elapsed time is reported to the pool's
//! [`QueryMonitor`], which logs a warning if it reached the threshold.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Tracks query durations against a slow-query threshold
#[derive(Debug)]
pub struct QueryMonitor {
    threshold: Duration,
    observed: AtomicU64,
    slow: AtomicU64,
}

impl QueryMonitor {
    /// Create a monitor with the threshold given in milliseconds
    pub fn new(threshold_ms: u64) -> Self {
        Self::with_threshold(Duration::from_millis(threshold_ms))
    }

    pub fn with_threshold(threshold: Duration) -> Self {
        Self {
            threshold,
            observed: AtomicU64::new(0),
            slow: AtomicU64::new(0),
        }
    }

    /// The configured threshold
    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// Whether a query that took `elapsed` counts as slow.
    ///
    /// A duration exactly equal to the threshold is slow.
    pub fn is_slow(&self, elapsed: Duration) -> bool {
        elapsed >= self.threshold
    }

    /// Record a finished query, logging it if slow.
    ///
    /// Returns `true` when a slow-query warning was emitted.
    pub fn observe(&self, query: &str, elapsed: Duration) -> bool {
        self.observed.fetch_add(1, Ordering::Relaxed);

        if !self.is_slow(elapsed) {
            tracing::trace!(query, elapsed_ms = elapsed.as_millis() as u64, "query finished");
            return false;
        }

        self.slow.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            query,
            elapsed_ms = elapsed.as_millis() as u64,
            threshold_ms = self.threshold.as_millis() as u64,
            "slow query"
        );
        true
    }

    /// Start timing a query; the result is reported when the timer drops
    pub fn start(&self, query: &'static str) -> QueryTimer<'_> {
        QueryTimer {
            monitor: self,
            query,
            started: Instant::now(),
        }
    }

    /// Number of queries observed so far
    pub fn observed_queries(&self) -> u64 {
        self.observed.load(Ordering::Relaxed)
    }

    /// Number of queries logged as slow so far
    pub fn slow_queries(&self) -> u64 {
        self.slow.load(Ordering::Relaxed)
    }
}

/// Drop guard measuring one query
pub struct QueryTimer<'a> {
    monitor: &'a QueryMonitor,
    query: &'static str,
    started: Instant,
}

impl QueryTimer<'_> {
    /// Time elapsed since the timer started
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Drop for QueryTimer<'_> {
    fn drop(&mut self) {
        self.monitor.observe(self.query, self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_threshold_boundary() {
        let monitor = QueryMonitor::new(100);

        assert!(monitor.observe("exact", Duration::from_millis(100)));
        assert!(!monitor.observe("just_under", Duration::from_millis(99)));
        assert!(monitor.observe("over", Duration::from_millis(101)));

        assert_eq!(monitor.observed_queries(), 3);
        assert_eq!(monitor.slow_queries(), 2);
    }

    #[test]
    fn test_zero_threshold_logs_everything() {
        let monitor = QueryMonitor::new(0);
        assert!(monitor.observe("instant", Duration::ZERO));
        assert_eq!(monitor.slow_queries(), 1);
    }

    #[test]
    fn test_timer_reports_on_drop() {
        let monitor = QueryMonitor::new(60_000);
        {
            let _timer = monitor.start("users.get_by_id");
        }
        assert_eq!(monitor.observed_queries(), 1);
        assert_eq!(monitor.slow_queries(), 0);
    }

    #[test]
    fn test_timer_flags_slow_query() {
        let monitor = QueryMonitor::new(5);
        {
            let _timer = monitor.start("sleepy");
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(monitor.slow_queries(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// A query is logged iff its duration is at least the threshold.
        #[test]
        fn slow_iff_at_or_above_threshold(threshold in 1u64..10_000, elapsed in 0u64..20_000) {
            let monitor = QueryMonitor::new(threshold);
            let logged = monitor.observe("q", Duration::from_millis(elapsed));
            prop_assert_eq!(logged, elapsed >= threshold);
            prop_assert!(monitor.observe("at", Duration::from_millis(threshold)));
            prop_assert!(!monitor.observe("below", Duration::from_millis(threshold - 1)));
        }
    }
}
