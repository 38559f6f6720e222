//! CLI argument parsing definitions

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use searchload::{
    Config,
    config::{DEFAULT_BASE_URL, DEFAULT_CONCURRENCY, DEFAULT_REQUESTS},
    profile::ScenarioKind,
};

#[derive(Debug, Parser)]
#[command(name = "searchload", author, version, about = "Load test the search API")]
pub struct Cli {
    /// Base URL of the service
    #[arg(short, long, env = "SEARCHLOAD_URL", default_value = DEFAULT_BASE_URL)]
    pub url: String,

    /// Test scenario
    #[arg(short, long, env = "SEARCHLOAD_SCENARIO", value_enum, default_value_t = ScenarioKind::Basic)]
    pub scenario: ScenarioKind,

    /// Total number of requests (basic scenario)
    #[arg(short, long, default_value_t = DEFAULT_REQUESTS)]
    pub requests: u64,

    /// Number of concurrent workers (basic scenario)
    #[arg(short, long = "concurrent", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Test duration, e.g. `30s` or `2m` (overrides --requests)
    #[arg(short, long, value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// Output file for results (JSON)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Per-request timeout
    #[arg(long, value_parser = humantime::parse_duration, default_value = "10s")]
    pub timeout: Duration,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SEARCHLOAD_LOG", value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Config {
            base_url: cli.url,
            scenario: cli.scenario,
            requests: cli.requests,
            concurrency: cli.concurrency,
            duration: cli.duration,
            output: cli.output,
            timeout: cli.timeout,
        }
    }
}
