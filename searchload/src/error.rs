/// Errors surfaced by the harness.
///
/// Per-request failures never show up here: those are recorded as
/// [`crate::metric::Outcome`]s and the run carries on. Only things that stop a
/// run (bad configuration, an unhealthy target, nothing to summarize, a report
/// that can't be written) are errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no latency samples were recorded, nothing to summarize")]
    EmptySamples,

    #[error("stage `{label}` must have a concurrency of at least 1")]
    ZeroConcurrency { label: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("aggregate is still shared with a running worker")]
    AggregateInUse,

    #[error("target is unhealthy: health probe returned status {status}")]
    Unhealthy { status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
