// Performance metrics for the pricing subsystem
//
// Tracks calculation counts, execution times and discount-cache hit rates
// to help identify slow pricing paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Performance threshold for slow operations (100ms)
const SLOW_OPERATION_THRESHOLD_MS: u64 = 100;

/// Performance metrics for the pricing subsystem
#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    // Cache metrics
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,

    // Operation counts
    quotes: AtomicU64,
    bundle_quotes: AtomicU64,

    // Timing metrics (in microseconds)
    total_quote_time_us: AtomicU64,
    total_bundle_quote_time_us: AtomicU64,

    // Slow operation counts
    slow_quotes: AtomicU64,
    slow_bundle_quotes: AtomicU64,
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                cache_hits: AtomicU64::new(0),
                cache_misses: AtomicU64::new(0),
                quotes: AtomicU64::new(0),
                bundle_quotes: AtomicU64::new(0),
                total_quote_time_us: AtomicU64::new(0),
                total_bundle_quote_time_us: AtomicU64::new(0),
                slow_quotes: AtomicU64::new(0),
                slow_bundle_quotes: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Cache hit rate in the range 0.0 to 1.0
    pub fn cache_hit_rate(&self) -> f64 {
        let hits = self.inner.cache_hits.load(Ordering::Relaxed);
        let misses = self.inner.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;

        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Start timing a single-product quote
    pub fn start_quote(&self) -> OperationTimer {
        OperationTimer::new(OperationType::Quote, self.clone())
    }

    /// Start timing a bundle quote
    pub fn start_bundle_quote(&self) -> OperationTimer {
        OperationTimer::new(OperationType::BundleQuote, self.clone())
    }

    fn record_quote(&self, duration: Duration) {
        self.inner.quotes.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_quote_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_OPERATION_THRESHOLD_MS {
            self.inner.slow_quotes.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow price quote: {}ms", duration.as_millis());
        }
    }

    fn record_bundle_quote(&self, duration: Duration) {
        self.inner.bundle_quotes.fetch_add(1, Ordering::Relaxed);
        self.inner
            .total_bundle_quote_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);

        if duration.as_millis() as u64 > SLOW_OPERATION_THRESHOLD_MS {
            self.inner.slow_bundle_quotes.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Slow bundle quote: {}ms", duration.as_millis());
        }
    }

    /// Snapshot of all counters for the metrics endpoint
    pub fn summary(&self) -> MetricsSummary {
        let quotes = self.inner.quotes.load(Ordering::Relaxed);
        let bundle_quotes = self.inner.bundle_quotes.load(Ordering::Relaxed);
        let total_quote_time_us = self.inner.total_quote_time_us.load(Ordering::Relaxed);
        let total_bundle_quote_time_us =
            self.inner.total_bundle_quote_time_us.load(Ordering::Relaxed);

        MetricsSummary {
            cache_hits: self.inner.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.inner.cache_misses.load(Ordering::Relaxed),
            cache_hit_rate: self.cache_hit_rate(),
            quotes,
            bundle_quotes,
            avg_quote_time_ms: average_ms(total_quote_time_us, quotes),
            avg_bundle_quote_time_ms: average_ms(total_bundle_quote_time_us, bundle_quotes),
            slow_quotes: self.inner.slow_quotes.load(Ordering::Relaxed),
            slow_bundle_quotes: self.inner.slow_bundle_quotes.load(Ordering::Relaxed),
        }
    }
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn average_ms(total_us: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_us as f64 / count as f64 / 1000.0
    }
}

/// Aggregated metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_rate: f64,
    pub quotes: u64,
    pub bundle_quotes: u64,
    pub avg_quote_time_ms: f64,
    pub avg_bundle_quote_time_ms: f64,
    pub slow_quotes: u64,
    pub slow_bundle_quotes: u64,
}

enum OperationType {
    Quote,
    BundleQuote,
}

/// Records the elapsed time of one operation when dropped
pub struct OperationTimer {
    operation: OperationType,
    metrics: PerformanceMetrics,
    started_at: Instant,
}

impl OperationTimer {
    fn new(operation: OperationType, metrics: PerformanceMetrics) -> Self {
        Self {
            operation,
            metrics,
            started_at: Instant::now(),
        }
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        let elapsed = self.started_at.elapsed();
        match self.operation {
            OperationType::Quote => self.metrics.record_quote(elapsed),
            OperationType::BundleQuote => self.metrics.record_bundle_quote(elapsed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_hit_rate() {
        let metrics = PerformanceMetrics::new();
        assert_eq!(metrics.cache_hit_rate(), 0.0);

        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_hit();
        metrics.record_cache_miss();

        assert!((metrics.cache_hit_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_timer_records_on_drop() {
        let metrics = PerformanceMetrics::new();

        {
            let _timer = metrics.start_quote();
        }
        {
            let _timer = metrics.start_bundle_quote();
        }

        let summary = metrics.summary();
        assert_eq!(summary.quotes, 1);
        assert_eq!(summary.bundle_quotes, 1);
    }

    #[test]
    fn test_summary_averages_handle_zero_counts() {
        let metrics = PerformanceMetrics::new();
        let summary = metrics.summary();

        assert_eq!(summary.avg_quote_time_ms, 0.0);
        assert_eq!(summary.avg_bundle_quote_time_ms, 0.0);
    }
}
