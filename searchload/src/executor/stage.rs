use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::Instant;
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{
    aggregate::Aggregate,
    error::{Error, Result},
    metric::Job,
    scenario::Scenario,
};
use internals::*;

/// When a stage stops enqueueing jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopCondition {
    /// Feed `concurrency` jobs per tick until the window has elapsed.
    For(Duration),
    /// Enqueue exactly this many jobs, back to back.
    Requests(u64),
}

/// A phase of the load profile with a fixed worker concurrency.
///
/// Use `Stage::timed("Warm-up", 10, Duration::from_secs(30))` to keep 10 workers
/// busy for 30s, or `Stage::counted("Basic", 10, 1000)` to push 1000 requests
/// through 10 workers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stage {
    pub label: String,
    pub concurrency: usize,
    pub stop: StopCondition,
}

impl Stage {
    pub fn new(label: impl Into<String>, concurrency: usize, stop: StopCondition) -> Self {
        Self {
            label: label.into(),
            concurrency,
            stop,
        }
    }

    pub fn timed(label: impl Into<String>, concurrency: usize, duration: Duration) -> Self {
        Self::new(label, concurrency, StopCondition::For(duration))
    }

    pub fn counted(label: impl Into<String>, concurrency: usize, requests: u64) -> Self {
        Self::new(label, concurrency, StopCondition::Requests(requests))
    }
}

/// What happened during one stage.
#[derive(Clone, Debug)]
pub struct StageRecord {
    pub label: String,
    pub concurrency: usize,
    /// Jobs put on the queue.
    pub enqueued: u64,
    /// Jobs taken off the queue and recorded by a worker.
    pub completed: u64,
    /// Wall clock, taken before the first worker was spawned.
    pub started_at: std::time::Instant,
    /// Wall clock, taken after the last worker was joined.
    pub finished_at: std::time::Instant,
}

/// Result of a full run: the aggregate, now exclusively owned again, plus a
/// record per stage.
#[derive(Debug)]
pub struct Execution<A> {
    pub aggregate: A,
    pub stages: Vec<StageRecord>,
    /// Time from the start of the first stage to the end of the last one.
    pub elapsed: Duration,
}

/// Executor that runs [`Stage`]s sequentially, each with its own worker pool.
///
/// - Every stage gets a fresh bounded job queue and `stage.concurrency` workers.
/// - Workers drain the queue until it is closed and empty, recording one metric
///   per job into the aggregate shared by the whole run.
/// - A stage ends with a join barrier on all of its workers.
///
/// # Tuning Knobs
///
/// - `tick`: pause between two batches of a duration-bound stage. One batch is
///   `concurrency` jobs.
/// - `queue_depth`: jobs buffered per worker before the feeder blocks.
#[derive(TypedBuilder)]
pub struct StageExecutor {
    /// The stages to run, in order.
    pub stages: Vec<Stage>,
    #[builder(default = Duration::from_secs(1))]
    pub tick: Duration,
    #[builder(default = 100)]
    pub queue_depth: usize,
}

impl StageExecutor {
    fn validate(&self) -> Result<()> {
        if self.queue_depth == 0 {
            return Err(Error::Config("queue depth must be at least 1".into()));
        }
        if let Some(stage) = self.stages.iter().find(|s| s.concurrency == 0) {
            return Err(Error::ZeroConcurrency {
                label: stage.label.clone(),
            });
        }
        Ok(())
    }
}

impl<A, F, Fut> Executor<A, F, Fut> for StageExecutor
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn(Job) -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send + 'static,
{
    async fn exec(&self, scenario: &Scenario<A, Self, F, Fut>) -> Result<Execution<A>> {
        self.validate()?;

        let aggregate = Arc::new(A::new());
        let mut records = Vec::with_capacity(self.stages.len());
        let run_start = Instant::now();
        let j = self.stages.len();

        tracing::info!("Running scenario: {}!", scenario.name);
        for (i, stage) in self.stages.iter().enumerate() {
            tracing::info!(
                "Starting stage {}/{j}: {} ({} workers)",
                i + 1,
                stage.label,
                stage.concurrency
            );
            let started_at = std::time::Instant::now();
            let (jobs_tx, jobs_rx) = async_channel::bounded(stage.concurrency * self.queue_depth);

            let handles = spawn_workers(
                jobs_rx,
                stage.concurrency,
                scenario.action.clone(),
                Arc::clone(&aggregate),
            );

            let enqueued = match stage.stop {
                StopCondition::Requests(requests) => feed_requests(&jobs_tx, i, requests).await,
                StopCondition::For(duration) => {
                    feed_for(&jobs_tx, i, stage.concurrency, duration, self.tick).await
                }
            };
            // Workers see the close once they have emptied the queue.
            jobs_tx.close();

            let completed = drain(handles).await;
            tracing::info!(
                "Finishing stage {}/{j}: {} ({completed} requests)",
                i + 1,
                stage.label
            );

            records.push(StageRecord {
                label: stage.label.clone(),
                concurrency: stage.concurrency,
                enqueued,
                completed,
                started_at,
                finished_at: std::time::Instant::now(),
            });
        }
        let elapsed = run_start.elapsed();

        // Every worker has been joined, so this is the last reference.
        let aggregate = Arc::try_unwrap(aggregate).map_err(|_| Error::AggregateInUse)?;

        tracing::info!("Done running scenario: {}!", scenario.name);
        Ok(Execution {
            aggregate,
            stages: records,
            elapsed,
        })
    }
}

#[cfg(feature = "internals")]
pub use internals::*;

/// Building blocks of the `StageExecutor`.
mod internals {
    use async_channel::{Receiver, Sender};
    use futures::future::join_all;
    use tokio::task::JoinHandle;

    use super::*;

    /// Count-bound stages log their progress every this many jobs.
    pub const PROGRESS_EVERY: u64 = 100;

    /// Spawns `workers` Tokio tasks sharing one job queue.
    ///
    /// Each worker takes jobs until the queue is closed and empty, runs the
    /// `action` for every job and records the metric. Returns, per worker, the
    /// number of jobs it handled.
    pub fn spawn_workers<A, F, Fut>(
        jobs: Receiver<Job>,
        workers: usize,
        action: F,
        aggregate: Arc<A>,
    ) -> Vec<JoinHandle<u64>>
    where
        A: Aggregate,
        F: Fn(Job) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = A::Metric> + Send + 'static,
    {
        (0..workers)
            .map(|i| {
                let jobs = jobs.clone();
                let action = action.clone();
                let aggregate = Arc::clone(&aggregate);
                tokio::spawn(async move {
                    let mut handled = 0;
                    while let Ok(job) = jobs.recv().await {
                        let metric = action(job).await;
                        aggregate.record(&metric);
                        handled += 1;
                    }
                    tracing::debug!("Worker {i} shutting down after {handled} jobs.");
                    handled
                })
            })
            .collect()
    }

    /// Enqueue `requests` jobs as fast as the queue accepts them.
    ///
    /// Returns the number of jobs enqueued, which is only short of `requests`
    /// if every worker has gone away.
    pub async fn feed_requests(jobs: &Sender<Job>, stage: usize, requests: u64) -> u64 {
        for seq in 0..requests {
            if jobs.send(Job { stage, seq }).await.is_err() {
                tracing::warn!("All workers exited, stopped enqueueing at {seq}/{requests}");
                return seq;
            }
            if (seq + 1) % PROGRESS_EVERY == 0 {
                tracing::info!("Progress: {}/{requests}", seq + 1);
            }
        }
        requests
    }

    /// Enqueue `concurrency` jobs per `tick` until `duration` has elapsed.
    ///
    /// The deadline is checked before each batch, so a window shorter than one
    /// tick yields one batch at most.
    pub async fn feed_for(
        jobs: &Sender<Job>,
        stage: usize,
        concurrency: usize,
        duration: Duration,
        tick: Duration,
    ) -> u64 {
        let end = Instant::now() + duration;
        let mut seq = 0;

        while Instant::now() < end {
            for _ in 0..concurrency {
                if jobs.send(Job { stage, seq }).await.is_err() {
                    tracing::warn!("All workers exited, stopped enqueueing after {seq} jobs");
                    return seq;
                }
                seq += 1;
            }
            tokio::time::sleep(tick).await;
        }
        seq
    }

    /// Join every worker of a pool and sum the jobs they handled.
    pub async fn drain(handles: Vec<JoinHandle<u64>>) -> u64 {
        join_all(handles)
            .await
            .into_iter()
            .map(|res| match res {
                Ok(handled) => handled,
                Err(e) => {
                    // not restarted, the other workers finish the queue
                    tracing::error!("Worker panicked with error: {e}");
                    0
                }
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    use parking_lot::Mutex;
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::Metric;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Seen {
        stage: usize,
        seq: u64,
    }

    impl Metric for Seen {}

    #[derive(Debug, Default)]
    struct SeenJobs(Mutex<Vec<Seen>>);

    impl Aggregate for SeenJobs {
        type Metric = Seen;

        fn new() -> Self {
            Self::default()
        }

        fn record(&self, metric: &Seen) {
            self.0.lock().push(metric.clone());
        }
    }

    fn echo(job: Job) -> impl Future<Output = Seen> + Send + 'static {
        async move {
            Seen {
                stage: job.stage,
                seq: job.seq,
            }
        }
    }

    async fn run(executor: StageExecutor) -> Result<Execution<SeenJobs>> {
        Scenario::<SeenJobs, _, _, _>::builder()
            .name("test")
            .action(echo)
            .executor(executor)
            .build()
            .run()
            .await
    }

    #[tokio::test]
    async fn spawn_expected_number_of_workers() {
        let n = 10;
        let (tx, rx) = async_channel::bounded::<Job>(1);
        tx.close();
        let workers = spawn_workers(rx, n, echo, Arc::new(SeenJobs::new()));

        assert_eq!(workers.len(), n);
        assert_eq!(drain(workers).await, 0);
    }

    #[tokio::test]
    async fn counted_stage_handles_every_job_exactly_once() {
        let execution = run(StageExecutor::builder()
            .stages(vec![Stage::counted("basic", 7, 500)])
            .queue_depth(3)
            .build())
        .await
        .unwrap();

        let mut seqs: Vec<u64> = execution
            .aggregate
            .0
            .into_inner()
            .into_iter()
            .map(|s| s.seq)
            .collect();
        seqs.sort_unstable();
        assert_eq!(seqs, (0..500).collect::<Vec<_>>());

        let record = &execution.stages[0];
        assert_eq!(record.label, "basic");
        assert_eq!(record.enqueued, 500);
        assert_eq!(record.completed, 500);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_stage_enqueues_one_batch_per_tick() {
        let execution = run(StageExecutor::builder()
            .stages(vec![Stage::timed("hold", 4, Duration::from_secs(3))])
            .build())
        .await
        .unwrap();

        // batches at t=0s, 1s and 2s; at t=3s the window is over
        assert_eq!(execution.stages[0].enqueued, 12);
        assert_eq!(execution.aggregate.0.lock().len(), 12);
        assert!(execution.elapsed >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stage_shorter_than_a_tick_enqueues_at_most_one_batch() {
        let execution = run(StageExecutor::builder()
            .stages(vec![
                Stage::timed("blip", 5, Duration::from_millis(500)),
                Stage::timed("nothing", 5, Duration::ZERO),
            ])
            .build())
        .await
        .unwrap();

        assert_eq!(execution.stages[0].enqueued, 5);
        assert_eq!(execution.stages[1].enqueued, 0);
        assert_eq!(execution.stages[1].completed, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stages_never_overlap() {
        let concurrency = [2, 8, 3];
        let in_flight: Arc<[AtomicUsize; 3]> = Arc::new(Default::default());
        let peaks: Arc<[AtomicUsize; 3]> = Arc::new(Default::default());
        let overlaps = Arc::new(AtomicU64::new(0));

        let action = {
            let (in_flight, peaks, overlaps) =
                (in_flight.clone(), peaks.clone(), overlaps.clone());
            move |job: Job| {
                let (in_flight, peaks, overlaps) =
                    (in_flight.clone(), peaks.clone(), overlaps.clone());
                async move {
                    let now = in_flight[job.stage].fetch_add(1, Ordering::SeqCst) + 1;
                    peaks[job.stage].fetch_max(now, Ordering::SeqCst);
                    let others_busy = (0..3)
                        .filter(|&s| s != job.stage)
                        .any(|s| in_flight[s].load(Ordering::SeqCst) > 0);
                    if others_busy {
                        overlaps.fetch_add(1, Ordering::SeqCst);
                    }
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    in_flight[job.stage].fetch_sub(1, Ordering::SeqCst);
                    Seen {
                        stage: job.stage,
                        seq: job.seq,
                    }
                }
            }
        };

        let execution = Scenario::<SeenJobs, _, _, _>::builder()
            .name("sequential")
            .action(action)
            .executor(
                StageExecutor::builder()
                    .stages(vec![
                        Stage::counted("low", concurrency[0], 40),
                        Stage::counted("high", concurrency[1], 160),
                        Stage::counted("recovery", concurrency[2], 30),
                    ])
                    .build(),
            )
            .build()
            .run()
            .await
            .unwrap();

        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
        for (stage, limit) in concurrency.iter().enumerate() {
            let peak = peaks[stage].load(Ordering::SeqCst);
            assert!(peak >= 1 && peak <= *limit, "stage {stage}: peak {peak} > {limit}");
        }
        assert_eq!(execution.aggregate.0.lock().len(), 230);
        let windows: Vec<_> = execution
            .stages
            .windows(2)
            .map(|w| w[0].finished_at <= w[1].started_at)
            .collect();
        assert_eq!(windows, vec![true, true]);
    }

    #[tokio::test]
    async fn zero_concurrency_is_rejected() {
        let err = run(StageExecutor::builder()
            .stages(vec![
                Stage::counted("ok", 1, 1),
                Stage::counted("broken", 0, 1),
            ])
            .build())
        .await
        .unwrap_err();

        assert!(matches!(err, Error::ZeroConcurrency { label } if label == "broken"));
    }

    #[tokio::test]
    async fn zero_queue_depth_is_rejected() {
        let err = run(StageExecutor::builder()
            .stages(vec![Stage::counted("ok", 1, 1)])
            .queue_depth(0)
            .build())
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn feeding_stops_when_workers_are_gone() {
        let (tx, rx) = async_channel::bounded::<Job>(4);
        drop(rx);
        assert_eq!(feed_requests(&tx, 0, 10).await, 0);
    }
}
