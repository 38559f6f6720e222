//! Built-in load profiles, expressed as plain stage lists.

use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{error::Error, executor::Stage};

/// The named scenarios the harness ships with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    /// Fixed number of requests at a fixed concurrency.
    #[default]
    Basic,
    /// Four timed stages of increasing concurrency.
    Stress,
    /// Baseline, sudden spike, recovery.
    Spike,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScenarioKind::Basic => "basic",
            ScenarioKind::Stress => "stress",
            ScenarioKind::Spike => "spike",
        })
    }
}

impl FromStr for ScenarioKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(ScenarioKind::Basic),
            "stress" => Ok(ScenarioKind::Stress),
            "spike" => Ok(ScenarioKind::Spike),
            other => Err(Error::Config(format!(
                "unknown scenario `{other}`, expected basic|stress|spike"
            ))),
        }
    }
}

/// `requests` jobs pushed through `concurrency` workers.
pub fn basic(requests: u64, concurrency: usize) -> Vec<Stage> {
    vec![Stage::counted(
        format!("Basic load ({requests} requests, {concurrency} users)"),
        concurrency,
        requests,
    )]
}

/// `concurrency` workers kept busy for `duration`.
pub fn constant(concurrency: usize, duration: Duration) -> Vec<Stage> {
    vec![Stage::timed(
        format!("Constant load ({concurrency} users, {}s)", duration.as_secs()),
        concurrency,
        duration,
    )]
}

pub fn stress() -> Vec<Stage> {
    vec![
        Stage::timed("Warm-up (10 users)", 10, Duration::from_secs(30)),
        Stage::timed("Normal load (50 users)", 50, Duration::from_secs(60)),
        Stage::timed("High load (100 users)", 100, Duration::from_secs(60)),
        Stage::timed("Peak load (200 users)", 200, Duration::from_secs(30)),
    ]
}

pub fn spike() -> Vec<Stage> {
    vec![
        Stage::timed("Normal load (20 users, 30s)", 20, Duration::from_secs(30)),
        Stage::timed("SPIKE! (200 users, 10s)", 200, Duration::from_secs(10)),
        Stage::timed("Recovery (20 users, 30s)", 20, Duration::from_secs(30)),
    ]
}
