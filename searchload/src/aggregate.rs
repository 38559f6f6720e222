use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::metric::{CacheStatus, Metric, Outcome};

/// The `Aggregate` trait defines how [`Metric`]s produced by the workers are
/// accumulated during a run.
///
/// A single aggregate is shared by every worker of every stage, so recording
/// goes through `&self` and implementations are responsible for their own
/// synchronization (atomics, a lock, or both).
///
/// **Important:** aggregates only accumulate. Averages, percentiles and rates are
/// derived afterwards by a [`crate::report::Summary`] once the executor has handed
/// the aggregate back, at which point nobody else can be writing to it.
///
/// # Example
/// ```rust
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use searchload::{Aggregate, metric::Outcome};
///
/// #[derive(Default)]
/// struct Successes(AtomicU64);
///
/// impl Aggregate for Successes {
///     type Metric = Outcome;
///
///     fn new() -> Self {
///         Self::default()
///     }
///
///     fn record(&self, metric: &Outcome) {
///         if metric.is_success() {
///             self.0.fetch_add(1, Ordering::Relaxed);
///         }
///     }
/// }
/// ```
pub trait Aggregate
where
    Self: Send + Sync + 'static,
{
    /// The metric type this aggregate accumulates.
    type Metric: Metric;

    /// Create a new, empty aggregate.
    fn new() -> Self;

    /// Fold a single metric in. Called concurrently from every worker.
    fn record(&self, metric: &Self::Metric);

    /// Record multiple metrics.
    fn record_all(&self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.record(m));
    }
}

/// Counters and latency samples for a search load test.
///
/// Counters are independent atomics. Samples are appended under a single mutex;
/// append is the only mutation so nothing finer-grained is needed.
///
/// `total == successful + failed` does **not** hold in general: a 200 response
/// whose body says `"success": false` counts once as a success and once more as
/// a failure. The relation that does hold is
/// `total + app_failures == successful + failed`.
#[derive(Debug, Default)]
pub struct SearchMetrics {
    total: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    samples: Mutex<Vec<f64>>,
}

impl Aggregate for SearchMetrics {
    type Metric = Outcome;

    fn new() -> Self {
        SearchMetrics::default()
    }

    fn record(&self, metric: &Outcome) {
        self.total.fetch_add(1, Ordering::Relaxed);

        if metric.is_success() {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }
        match metric.cache() {
            Some(CacheStatus::Hit) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            Some(CacheStatus::Miss) => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }
        if metric.is_app_failure() {
            self.failure.fetch_add(1, Ordering::Relaxed);
        }

        self.samples.lock().push(metric.latency_ms());
    }
}

impl SearchMetrics {
    /// Consume the aggregate into plain values.
    ///
    /// Taking `self` by value means this can only run once every worker has
    /// dropped its handle.
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot {
            total: self.total.into_inner(),
            successful: self.success.into_inner(),
            failed: self.failure.into_inner(),
            cache_hits: self.cache_hits.into_inner(),
            cache_misses: self.cache_misses.into_inner(),
            samples: self.samples.into_inner(),
        }
    }
}

/// Final state of a [`SearchMetrics`], ready to be summarized.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Latency samples in milliseconds, in no particular order.
    pub samples: Vec<f64>,
}
