use std::{fmt::Debug, time::Duration};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Responses served faster than this are counted as cache hits.
///
/// This is a latency heuristic, the target API sends no cache signal.
pub const CACHE_HIT_THRESHOLD: Duration = Duration::from_millis(100);

/// A `Metric` is a single observation produced by one unit of work.
///
/// Metrics are folded into an [`crate::Aggregate`] as soon as they are produced and
/// then discarded. They must be cheap to clone and safe to hand across tasks.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialEq + Send + Sync + Debug + Clone + 'static,
{
}

/// One unit of work: exactly one request to be issued.
///
/// A job carries no payload. `stage` and `seq` only exist so that logs and test
/// instrumentation can tell jobs apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Job {
    /// Index of the stage that enqueued the job.
    pub stage: usize,
    /// Position of the job within its stage.
    pub seq: u64,
}

/// How a request ended, before any counting happens.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// Connection refused, timeout, DNS failure and friends.
    TransportError,
    /// The server answered with something other than 200.
    BadStatus(u16),
    /// HTTP 200. `app_success` is the body's `success` flag, `None` when the
    /// body could not be decoded.
    Ok { app_success: Option<bool> },
}

/// Cache classification of a 200 response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn classify(latency: Duration) -> Self {
        if latency < CACHE_HIT_THRESHOLD {
            CacheStatus::Hit
        } else {
            CacheStatus::Miss
        }
    }
}

/// The classified result of one completed job.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub latency: Duration,
    pub verdict: Verdict,
}

impl Metric for Outcome {}

impl Outcome {
    pub fn new(latency: Duration, verdict: Verdict) -> Self {
        Self { latency, verdict }
    }

    /// Whether the request counts as a success at the HTTP level.
    pub fn is_success(&self) -> bool {
        matches!(self.verdict, Verdict::Ok { .. })
    }

    /// Latency in (fractional) milliseconds, the unit samples are stored in.
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_nanos() as f64 / 1_000_000.0
    }

    /// Only 200 responses are cache-classified.
    pub fn cache(&self) -> Option<CacheStatus> {
        self.is_success().then(|| CacheStatus::classify(self.latency))
    }

    /// True for a 200 whose body explicitly reported `success: false`.
    pub fn is_app_failure(&self) -> bool {
        matches!(
            self.verdict,
            Verdict::Ok {
                app_success: Some(false)
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_threshold_is_exclusive() {
        assert_eq!(
            CacheStatus::classify(Duration::from_millis(99)),
            CacheStatus::Hit
        );
        assert_eq!(
            CacheStatus::classify(Duration::from_micros(99_999)),
            CacheStatus::Hit
        );
        assert_eq!(
            CacheStatus::classify(Duration::from_millis(100)),
            CacheStatus::Miss
        );
    }

    #[test]
    fn failures_are_not_cache_classified() {
        let fast = Duration::from_millis(5);
        assert_eq!(Outcome::new(fast, Verdict::TransportError).cache(), None);
        assert_eq!(Outcome::new(fast, Verdict::BadStatus(503)).cache(), None);
        assert_eq!(
            Outcome::new(fast, Verdict::Ok { app_success: None }).cache(),
            Some(CacheStatus::Hit)
        );
    }

    #[test]
    fn latency_is_reported_in_milliseconds() {
        let outcome = Outcome::new(Duration::from_micros(12_500), Verdict::TransportError);
        assert_eq!(outcome.latency_ms(), 12.5);
    }

    #[test]
    fn app_failure_only_on_explicit_false() {
        let ok = |flag| Outcome::new(Duration::ZERO, Verdict::Ok { app_success: flag });
        assert!(ok(Some(false)).is_app_failure());
        assert!(!ok(Some(true)).is_app_failure());
        assert!(!ok(None).is_app_failure());
        assert!(!Outcome::new(Duration::ZERO, Verdict::BadStatus(500)).is_app_failure());
    }
}
