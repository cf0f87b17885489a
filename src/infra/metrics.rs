//! Lock-free metrics collection and periodic reporting
//!
//! The engine records on the hot path with atomics only; the reporter task
//! swaps the periodic counters out to build a snapshot.
//!
//! NOTE: All atomics use Relaxed ordering intentionally. These are statistical
//! counters only and must not drive engine decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Prometheus-style exponential bucket boundaries (microseconds)
/// Buckets: ≤10, ≤20, ≤40, ≤80, ≤160, ≤320, ≤640, ≤1280, ≤2560, ≤5120, >5120
const BUCKET_BOUNDS: [u64; 10] = [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120];
pub const METRICS_NUM_BUCKETS: usize = 11;

/// Compute bucket index for a latency value using binary search
#[inline]
fn bucket_index(latency_us: u64) -> usize {
    BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Swap all buckets to zero and return their values
#[inline]
fn swap_buckets(buckets: &[AtomicU64; METRICS_NUM_BUCKETS]) -> [u64; METRICS_NUM_BUCKETS] {
    let mut result = [0u64; METRICS_NUM_BUCKETS];
    for (i, bucket) in buckets.iter().enumerate() {
        result[i] = bucket.swap(0, Ordering::Relaxed);
    }
    result
}

/// Compute percentile from histogram buckets
/// Returns the upper bound of the bucket containing the percentile
fn percentile_from_buckets(buckets: &[u64; METRICS_NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = (total as f64 * percentile) as u64;
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; METRICS_NUM_BUCKETS] =
        [10, 20, 40, 80, 160, 320, 640, 1280, 2560, 5120, 10240];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[METRICS_NUM_BUCKETS - 1]
}

/// Lock-free metrics collector
pub struct Metrics {
    /// Total ticks ever processed (monotonic)
    ticks_total: AtomicU64,
    /// Ticks since last report (reset on report)
    ticks_since_report: AtomicU64,
    /// Ticks with no visible subject (monotonic)
    absent_ticks_total: AtomicU64,
    /// Sum of tick latencies in microseconds (reset on report)
    latency_sum_us: AtomicU64,
    /// Max tick latency in microseconds (reset on report)
    latency_max_us: AtomicU64,
    /// Tick latency histogram buckets (reset on report)
    latency_buckets: [AtomicU64; METRICS_NUM_BUCKETS],
    /// Events handed to the sink (monotonic)
    events_emitted: AtomicU64,
    /// Resolved labels dropped because they matched the last emitted one (monotonic)
    events_suppressed: AtomicU64,
    /// Sink writes that failed (monotonic)
    sink_failures: AtomicU64,
    /// Malformed source lines skipped (monotonic)
    source_errors: AtomicU64,
    /// Last report time (only accessed from reporter)
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ticks_total: AtomicU64::new(0),
            ticks_since_report: AtomicU64::new(0),
            absent_ticks_total: AtomicU64::new(0),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            events_emitted: AtomicU64::new(0),
            events_suppressed: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one processed tick (lock-free)
    #[inline]
    pub fn record_tick(&self, latency_us: u64, subject_visible: bool) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
        self.ticks_since_report.fetch_add(1, Ordering::Relaxed);
        if !subject_visible {
            self.absent_ticks_total.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_emitted(&self) {
        self.events_emitted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_event_suppressed(&self) {
        self.events_suppressed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_failure(&self) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_source_error(&self) {
        self.source_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ticks_total(&self) -> u64 {
        self.ticks_total.load(Ordering::Relaxed)
    }

    pub fn absent_ticks_total(&self) -> u64 {
        self.absent_ticks_total.load(Ordering::Relaxed)
    }

    pub fn events_emitted(&self) -> u64 {
        self.events_emitted.load(Ordering::Relaxed)
    }

    pub fn events_suppressed(&self) -> u64 {
        self.events_suppressed.load(Ordering::Relaxed)
    }

    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    pub fn source_errors(&self) -> u64 {
        self.source_errors.load(Ordering::Relaxed)
    }

    /// Swap periodic counters and build a summary
    pub fn report(&self) -> MetricsSummary {
        let tick_count = self.ticks_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.latency_sum_us.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);
        let lat_buckets = swap_buckets(&self.latency_buckets);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let ticks_per_sec = if elapsed.as_secs_f64() > 0.0 {
            tick_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        let avg_latency = if tick_count > 0 { latency_sum / tick_count } else { 0 };

        MetricsSummary {
            ticks_total: self.ticks_total(),
            ticks_per_sec,
            absent_ticks_total: self.absent_ticks_total(),
            avg_tick_latency_us: avg_latency,
            max_tick_latency_us: max_latency,
            lat_buckets,
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p95_us: percentile_from_buckets(&lat_buckets, 0.95),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            events_emitted: self.events_emitted(),
            events_suppressed: self.events_suppressed(),
            sink_failures: self.sink_failures(),
            source_errors: self.source_errors(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub ticks_total: u64,
    pub ticks_per_sec: f64,
    pub absent_ticks_total: u64,
    pub avg_tick_latency_us: u64,
    pub max_tick_latency_us: u64,
    pub lat_buckets: [u64; METRICS_NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p95_us: u64,
    pub lat_p99_us: u64,
    pub events_emitted: u64,
    pub events_suppressed: u64,
    pub sink_failures: u64,
    pub source_errors: u64,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            ticks_total = %self.ticks_total,
            ticks_per_sec = format!("{:.1}", self.ticks_per_sec),
            absent_ticks = %self.absent_ticks_total,
            avg_latency_us = %self.avg_tick_latency_us,
            max_latency_us = %self.max_tick_latency_us,
            p50_us = %self.lat_p50_us,
            p95_us = %self.lat_p95_us,
            p99_us = %self.lat_p99_us,
            events_emitted = %self.events_emitted,
            events_suppressed = %self.events_suppressed,
            sink_failures = %self.sink_failures,
            source_errors = %self.source_errors,
            "metrics"
        );
    }
}
