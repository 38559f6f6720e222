//! Searchload — staged load generation against a search API.
//!
//! Searchload drives configurable volumes of `GET /api/search` requests at a target,
//! records latency and success/failure for every request, and reduces the run to a
//! small set of statistics (success rate, throughput, latency percentiles, cache hit
//! rate).
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`Scenario`]: glue that ties an action (what one job does) to an executor.
//! - [`Executor`]: runs the scenario. The built-in [`StageExecutor`] runs a list of
//!   [`Stage`]s one after the other, each with its own pool of workers fed from a
//!   bounded job queue.
//! - [`Metric`]: what one job produces. For HTTP runs that is a
//!   [`metric::Outcome`]: a latency plus a [`metric::Verdict`].
//! - [`Aggregate`]: a concurrency-safe accumulator shared by every worker of a run.
//!   [`SearchMetrics`] counts outcomes and keeps every latency sample.
//! - [`Summary`]: statistics derived once, after the run, from the aggregate.
//! - [`Reporter`]: sends a summary somewhere (stdout, a JSON file).
//!
//! Data flows one way:
//!
//! ```text
//! stages -> job queue -> workers -> HTTP call -> Outcome -> SearchMetrics -> Summary -> Reporter
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use searchload::{
//!     Job, Reporter, Scenario, SearchMetrics, StageExecutor, Summary,
//!     http::{DEFAULT_TIMEOUT, SearchClient},
//!     profile,
//!     report::StdoutReporter,
//! };
//!
//! #[tokio::main]
//! async fn main() -> searchload::Result<()> {
//!     // One pooled client, cloned into every worker.
//!     let client = SearchClient::new("http://localhost:8080", DEFAULT_TIMEOUT)?;
//!     client.probe().await?;
//!
//!     let execution = Scenario::<SearchMetrics, _, _, _>::builder()
//!         .name("spike")
//!         .action(move |job: Job| {
//!             let client = client.clone();
//!             async move { client.search(job).await }
//!         })
//!         .executor(StageExecutor::builder().stages(profile::spike()).build())
//!         .build()
//!         .run()
//!         .await?;
//!
//!     let summary = Summary::new(execution.aggregate.into_snapshot(), execution.elapsed)?;
//!     StdoutReporter.report(&summary).await
//! }
//! ```
//!
//! # Feature flags
//!
//! - `clap`: derives `clap::ValueEnum` for [`profile::ScenarioKind`].
//! - `internals`: exposes the executor's building blocks (`spawn_workers`,
//!   `feed_requests`, `feed_for`, `drain`).

/// Concurrency-safe accumulators
pub mod aggregate;
/// Run configuration
pub mod config;
mod error;
/// Orchestrators that define how things will actually run
pub mod executor;
/// The HTTP action and health probe
pub mod http;
/// Single observations
pub mod metric;
/// Built-in stage lists
pub mod profile;
/// Summaries and Reporters
pub mod report;
/// Random search requests
pub mod request;
/// Glue between action and executor
pub mod scenario;
/// Averages and percentiles
pub mod stats;

pub use aggregate::{Aggregate, SearchMetrics, Snapshot};
pub use config::Config;
pub use error::{Error, Result};
pub use executor::{Execution, Executor, Stage, StageExecutor, StopCondition};
pub use metric::{Job, Metric, Outcome};
pub use report::{Reporter, Summary};
pub use scenario::Scenario;
