use std::{fmt, future::Future, path::PathBuf, time::Duration};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::{aggregate::Snapshot, error::Result, stats::Latencies};

/// Success rate (percent) under which a run is flagged.
pub const MIN_SUCCESS_RATE: f64 = 95.0;
/// p95 latency (ms) over which a run is flagged.
pub const MAX_P95_MS: f64 = 1000.0;
/// Cache hit rate (percent) under which a run is flagged.
pub const MIN_CACHE_HIT_RATE: f64 = 50.0;

/// Latency distribution in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

impl From<&Latencies> for LatencySummary {
    fn from(latencies: &Latencies) -> Self {
        Self {
            avg: latencies.average(),
            min: latencies.min(),
            max: latencies.max(),
            p50: latencies.percentile(50.0),
            p95: latencies.percentile(95.0),
            p99: latencies.percentile(99.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub hits: u64,
    pub misses: u64,
    /// Percent of cache-classified (HTTP 200) responses that were hits.
    pub hit_rate: f64,
}

/// Derived, read-only view of a finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    /// Percent of requests answered with HTTP 200.
    pub success_rate: f64,
    pub total_time: Duration,
    pub requests_per_second: f64,
    pub latency: LatencySummary,
    pub cache: CacheSummary,
}

impl Summary {
    /// Summarize a snapshot taken after every worker has finished.
    ///
    /// Fails with [`crate::Error::EmptySamples`] when nothing was recorded.
    pub fn new(snapshot: Snapshot, total_time: Duration) -> Result<Self> {
        let latencies = Latencies::new(snapshot.samples)?;
        let total = snapshot.total;

        let secs = total_time.as_secs_f64();
        let requests_per_second = if secs > 0.0 { total as f64 / secs } else { 0.0 };

        Ok(Self {
            total_requests: total,
            successful: snapshot.successful,
            failed: snapshot.failed,
            success_rate: ratio(snapshot.successful, total),
            total_time,
            requests_per_second,
            latency: LatencySummary::from(&latencies),
            cache: CacheSummary {
                hits: snapshot.cache_hits,
                misses: snapshot.cache_misses,
                hit_rate: ratio(snapshot.cache_hits, snapshot.cache_hits + snapshot.cache_misses),
            },
        })
    }

    /// Flag the usual suspects: errors, slow tail, cold cache.
    pub fn assess(&self) -> Vec<Finding> {
        let mut findings = Vec::new();
        if self.success_rate < MIN_SUCCESS_RATE {
            findings.push(Finding::HighErrorRate {
                failed: self.failed,
            });
        }
        if self.latency.p95 > MAX_P95_MS {
            findings.push(Finding::SlowTail {
                p95: self.latency.p95,
            });
        }
        if self.cache.hit_rate < MIN_CACHE_HIT_RATE {
            findings.push(Finding::LowCacheHitRate {
                hit_rate: self.cache.hit_rate,
            });
        }
        findings
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Something in a [`Summary`] worth a second look.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Finding {
    HighErrorRate { failed: u64 },
    SlowTail { p95: f64 },
    LowCacheHitRate { hit_rate: f64 },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::HighErrorRate { failed } => write!(f, "High error rate: {failed} failures"),
            Finding::SlowTail { p95 } => {
                write!(f, "95th percentile {p95:.2}ms > 1000ms - consider optimization")
            }
            Finding::LowCacheHitRate { hit_rate } => {
                write!(f, "Low cache hit rate: {hit_rate:.2}%")
            }
        }
    }
}

/// The on-disk JSON document. Derived values are rounded to 2 decimals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonReport {
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub summary: JsonTotals,
    pub response_times: LatencySummary,
    pub cache: CacheSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JsonTotals {
    pub total_requests: u64,
    pub successful: u64,
    pub failed: u64,
    pub success_rate: f64,
    /// Seconds.
    pub total_time: f64,
    pub requests_per_second: f64,
}

impl From<&Summary> for JsonReport {
    fn from(s: &Summary) -> Self {
        let l = &s.latency;
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            summary: JsonTotals {
                total_requests: s.total_requests,
                successful: s.successful,
                failed: s.failed,
                success_rate: round2(s.success_rate),
                total_time: round2(s.total_time.as_secs_f64()),
                requests_per_second: round2(s.requests_per_second),
            },
            response_times: LatencySummary {
                avg: round2(l.avg),
                min: round2(l.min),
                max: round2(l.max),
                p50: round2(l.p50),
                p95: round2(l.p95),
                p99: round2(l.p99),
            },
            cache: CacheSummary {
                hits: s.cache.hits,
                misses: s.cache.misses,
                hit_rate: round2(s.cache.hit_rate),
            },
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A [`Reporter`] takes a finished [`Summary`] somewhere: a terminal, a file,
/// a dashboard.
///
/// Reporters are the I/O boundary. Everything before them (aggregate,
/// snapshot, summary) is plain data.
pub trait Reporter {
    fn report(&self, summary: &Summary) -> impl Future<Output = Result<()>>;
}

/// Human-readable summary and assessment on stdout.
pub struct StdoutReporter;

impl StdoutReporter {
    pub fn render(summary: &Summary) -> String {
        use fmt::Write;

        let s = summary;
        let mut out = String::new();
        let rule = "=".repeat(50);
        // writing to a String can't fail
        let _ = writeln!(out, "\n{rule}\nTest Results\n{rule}");
        let _ = writeln!(out, "Total Requests:        {}", s.total_requests);
        let _ = writeln!(out, "Successful:            {}", s.successful);
        let _ = writeln!(out, "Failed:                {}", s.failed);
        let _ = writeln!(out, "Success Rate:          {:.2}%", s.success_rate);
        let _ = writeln!(out, "Total Time:            {:.2}s", s.total_time.as_secs_f64());
        let _ = writeln!(out, "Requests/sec:          {:.2}", s.requests_per_second);
        let _ = writeln!(out);
        let _ = writeln!(out, "Avg Response Time:     {:.2}ms", s.latency.avg);
        let _ = writeln!(out, "Min Response Time:     {:.2}ms", s.latency.min);
        let _ = writeln!(out, "Max Response Time:     {:.2}ms", s.latency.max);
        let _ = writeln!(out, "50th Percentile:       {:.2}ms", s.latency.p50);
        let _ = writeln!(out, "95th Percentile:       {:.2}ms", s.latency.p95);
        let _ = writeln!(out, "99th Percentile:       {:.2}ms", s.latency.p99);
        let _ = writeln!(out);
        let _ = writeln!(out, "Cache Hits:            {}", s.cache.hits);
        let _ = writeln!(out, "Cache Misses:          {}", s.cache.misses);
        let _ = writeln!(out, "Cache Hit Rate:        {:.2}%", s.cache.hit_rate);

        let _ = writeln!(out, "\nPerformance Assessment\n{rule}");
        let findings = s.assess();
        if findings.is_empty() {
            let _ = writeln!(out, "All metrics look good!");
        }
        for finding in findings {
            let _ = writeln!(out, "WARNING: {finding}");
        }
        out
    }
}

impl Reporter for StdoutReporter {
    async fn report(&self, summary: &Summary) -> Result<()> {
        print!("{}", Self::render(summary));
        Ok(())
    }
}

/// Writes a pretty-printed [`JsonReport`] to `path`, replacing any existing file.
pub struct JsonFileReporter {
    pub path: PathBuf,
}

impl JsonFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Reporter for JsonFileReporter {
    async fn report(&self, summary: &Summary) -> Result<()> {
        let json = serde_json::to_vec_pretty(&JsonReport::from(summary))?;
        tokio::fs::write(&self.path, json).await?;
        tracing::info!("Results saved to: {}", self.path.display());
        Ok(())
    }
}
