use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    error::{Error, Result},
    executor::Stage,
    http::DEFAULT_TIMEOUT,
    profile::{self, ScenarioKind},
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUESTS: u64 = 1000;
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Everything a run needs, read once at startup and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct Config {
    #[builder(default = DEFAULT_BASE_URL.to_owned(), setter(into))]
    pub base_url: String,
    #[builder(default)]
    pub scenario: ScenarioKind,
    /// Total requests for the basic scenario.
    #[builder(default = DEFAULT_REQUESTS)]
    pub requests: u64,
    /// Workers for the basic scenario.
    #[builder(default = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,
    /// Run the basic scenario for this long instead of a request count.
    #[builder(default, setter(strip_option))]
    pub duration: Option<Duration>,
    /// Where to write the JSON report, if anywhere.
    #[builder(default, setter(strip_option, into))]
    pub output: Option<PathBuf>,
    /// Per-request timeout.
    #[builder(default = DEFAULT_TIMEOUT)]
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(Error::Config("base url must not be empty".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than zero".into()));
        }
        if self.scenario == ScenarioKind::Basic {
            if self.concurrency == 0 {
                return Err(Error::Config("concurrency must be at least 1".into()));
            }
            if self.duration.is_none() && self.requests == 0 {
                return Err(Error::Config("requests must be at least 1".into()));
            }
        }
        Ok(())
    }

    /// The stage list this configuration runs.
    ///
    /// `duration` only applies to the basic scenario, where it replaces the
    /// request count. Stress and spike have fixed shapes.
    pub fn stages(&self) -> Vec<Stage> {
        match (self.scenario, self.duration) {
            (ScenarioKind::Basic, Some(duration)) => profile::constant(self.concurrency, duration),
            (ScenarioKind::Basic, None) => profile::basic(self.requests, self.concurrency),
            (kind, duration) => {
                if duration.is_some() {
                    tracing::warn!("--duration is ignored by the {kind} scenario");
                }
                match kind {
                    ScenarioKind::Stress => profile::stress(),
                    _ => profile::spike(),
                }
            }
        }
    }
}
