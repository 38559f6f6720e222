//! Executor — orchestration of stages and the worker pool
//!
//! The `Executor` trait is the runtime hook that executes a `Scenario`. The
//! built-in [`StageExecutor`] runs a list of [`Stage`]s strictly one after the
//! other. Each stage has a fixed concurrency and stops either after a wall-clock
//! window or after a fixed number of jobs.
//!
//! # High-level flow (per stage)
//! 1. Create a fresh bounded job queue (`async_channel`, multi-consumer).
//! 2. Spawn `concurrency` worker tasks. Each worker loops: receive a [`Job`],
//!    call the scenario `action`, record the returned metric into the shared
//!    aggregate. A worker exits once the queue is closed *and* empty.
//! 3. Feed the queue:
//!    - count-bound stages enqueue every job back to back,
//!    - duration-bound stages enqueue `concurrency` jobs, sleep one `tick`, and
//!      repeat until the stage deadline has passed.
//! 4. Close the queue and join every worker (full barrier). Only then does the
//!    next stage start, so no two stages ever overlap.
//!
//! After the last stage the executor is the only owner of the aggregate again and
//! hands it back inside an [`Execution`].
//!
//! # Backpressure
//! The queue holds at most `concurrency * queue_depth` jobs. When the target is
//! slower than the feed rate, enqueueing blocks instead of letting the backlog
//! grow without bound. Duration-bound stages still stop on time; they just
//! enqueue fewer jobs.
//!
//! # Notes about correctness & robustness
//! - Jobs are claimed exactly once: every job sent before the queue is closed is
//!   received by exactly one worker.
//! - A stage shorter than one `tick` enqueues at most one batch, possibly none.
//! - A panicking worker is logged and not restarted; the rest of the pool keeps
//!   draining the queue.
//! - Nothing here is cancellable mid-stage. Timed stages run their whole window.
pub mod stage;
pub use stage::{Execution, Stage, StageExecutor, StageRecord, StopCondition};

use crate::{aggregate::Aggregate, error::Result, metric::Job, scenario::Scenario};
use std::future::Future;

/// The runtime hook that executes a `Scenario`.
///
/// Generic over the aggregate, the action and the action's future so that the
/// same executor drives real HTTP calls or a synthetic action in tests.
pub trait Executor<A, F, Fut>
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn(Job) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    /// Execute the scenario and return the final aggregate.
    fn exec(
        &self,
        scenario: &Scenario<A, Self, F, Fut>,
    ) -> impl Future<Output = Result<Execution<A>>> + Send;
}
