//! Generic parallel fan-out over the workflow runtime.
//!
//! Mirrors the shape of the pipelines that use it: a start step scatters
//! one process event per input, a capped worker step runs the job, and a
//! collector gathers exactly as many results as were dispatched. A failing
//! job becomes a [`InnerResult::Failed`] sentinel instead of aborting its
//! siblings; only parent cancellation (timeout) stops the whole fan-out.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::LampeResult;
use crate::workflow::Workflow;

/// Environment variable overriding the worker cap.
pub const PARALLEL_WORKFLOW_MAX_WORKERS_ENV: &str = "PARALLEL_WORKFLOW_MAX_WORKERS";

/// Default cap on concurrently running inner jobs.
pub const PARALLEL_WORKFLOW_MAX_WORKERS_DEFAULT: usize = 32;

/// The configured worker cap.
pub fn max_workers() -> usize {
    std::env::var(PARALLEL_WORKFLOW_MAX_WORKERS_ENV)
        .ok()
        .and_then(|v| v.parse().ok())
        .filter(|&n| n > 0)
        .unwrap_or(PARALLEL_WORKFLOW_MAX_WORKERS_DEFAULT)
}

/// Result slot for one inner job.
#[derive(Debug)]
pub enum InnerResult<T> {
    Ok(T),
    /// The job failed; siblings keep running.
    Failed { error: String },
}

impl<T> InnerResult<T> {
    pub fn into_ok(self) -> Option<T> {
        match self {
            Self::Ok(v) => Some(v),
            Self::Failed { .. } => None,
        }
    }
}

enum ParallelEvent<I, T> {
    Start(Vec<I>),
    Process(I),
    Result(InnerResult<T>),
    Stop(Vec<InnerResult<T>>),
}

impl<I, T> fmt::Debug for ParallelEvent<I, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(items) => write!(f, "Start(n={})", items.len()),
            Self::Process(_) => write!(f, "Process"),
            Self::Result(_) => write!(f, "Result"),
            Self::Stop(results) => write!(f, "Stop(n={})", results.len()),
        }
    }
}

type BoxedJobFuture<T> = Pin<Box<dyn Future<Output = LampeResult<T>> + Send>>;

/// Fans `inputs` over a bounded worker pool and collects every slot.
///
/// `workers` caps concurrently running jobs; the call returns once all
/// inputs are accounted for, successes and sentinels alike. An empty input
/// list returns an empty vec without spinning up a workflow.
pub async fn run_parallel<I, T, F, Fut>(
    inputs: Vec<I>,
    workers: usize,
    timeout: Option<Duration>,
    job: F,
) -> LampeResult<Vec<InnerResult<T>>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LampeResult<T>> + Send + 'static,
{
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    let total = inputs.len();
    debug!(inputs = total, workers, "starting parallel workflow");

    let job: Arc<dyn Fn(I) -> BoxedJobFuture<T> + Send + Sync> =
        Arc::new(move |input| Box::pin(job(input)));

    let process_job = job.clone();
    let workflow = Workflow::<ParallelEvent<I, T>>::builder(|e| matches!(e, ParallelEvent::Stop(_)))
        .step(
            "start",
            |e| matches!(e, ParallelEvent::Start(_)),
            move |ctx, ev| async move {
                let ParallelEvent::Start(items) = ev else { unreachable!() };
                ctx.set("num_to_collect", items.len()).await;
                for item in items {
                    ctx.send_event(ParallelEvent::Process(item));
                }
                Ok(vec![])
            },
        )
        .step_with_workers(
            "process_inner",
            workers.max(1),
            |e| matches!(e, ParallelEvent::Process(_)),
            move |_ctx, ev| {
                let job = process_job.clone();
                async move {
                    let ParallelEvent::Process(input) = ev else { unreachable!() };
                    let result = match job(input).await {
                        Ok(value) => InnerResult::Ok(value),
                        Err(e) => {
                            warn!(error = %e, "inner job failed, continuing siblings");
                            InnerResult::Failed { error: e.to_string() }
                        }
                    };
                    Ok(vec![ParallelEvent::Result(result)])
                }
            },
        )
        .step(
            "combine_results",
            |e| matches!(e, ParallelEvent::Result(_)),
            move |ctx, ev| async move {
                let expected: usize = ctx.get("num_to_collect").await.expect("set by start step");
                match ctx.collect_events("combine_results", ev, expected).await {
                    Some(batch) => {
                        debug!(collected = batch.len(), "collected all inner results");
                        let results = batch
                            .into_iter()
                            .map(|e| match e {
                                ParallelEvent::Result(r) => r,
                                _ => unreachable!("collector only buffers results"),
                            })
                            .collect();
                        Ok(vec![ParallelEvent::Stop(results)])
                    }
                    None => Ok(vec![]),
                }
            },
        )
        .timeout(timeout)
        .build();

    match workflow.run(ParallelEvent::Start(inputs)).await? {
        ParallelEvent::Stop(results) => Ok(results),
        _ => unreachable!("stop predicate only matches Stop"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::errors::Error;

    #[tokio::test]
    async fn collects_all_results() {
        let results = run_parallel(vec![1u32, 2, 3, 4], 8, None, |n| async move { Ok(n * 10) })
            .await
            .unwrap();
        let mut values: Vec<u32> = results.into_iter().filter_map(InnerResult::into_ok).collect();
        values.sort();
        assert_eq!(values, vec![10, 20, 30, 40]);
    }

    #[tokio::test]
    async fn failures_become_sentinels_without_cancelling_siblings() {
        let results = run_parallel(vec![1u32, 2, 3], 8, None, |n| async move {
            if n == 2 {
                Err(Error::Validation("agent exploded".into()))
            } else {
                Ok(n)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 3);
        let ok: Vec<u32> = results.iter().filter_map(|r| match r {
            InnerResult::Ok(v) => Some(*v),
            InnerResult::Failed { .. } => None,
        }).collect();
        assert_eq!(ok.len(), 2);
        let failed = results.iter().filter(|r| matches!(r, InnerResult::Failed { .. })).count();
        assert_eq!(failed, 1);
    }

    #[tokio::test]
    async fn worker_cap_bounds_concurrency() {
        static RUNNING: AtomicUsize = AtomicUsize::new(0);
        static PEAK: AtomicUsize = AtomicUsize::new(0);

        let cap = 3;
        let results = run_parallel((0..20u32).collect(), cap, None, |_n| async move {
            let now = RUNNING.fetch_add(1, Ordering::SeqCst) + 1;
            PEAK.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            RUNNING.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 20);
        assert!(PEAK.load(Ordering::SeqCst) <= cap);
    }

    #[tokio::test]
    async fn all_failures_still_account_for_every_slot() {
        let results = run_parallel(vec![1u32, 2, 3], 2, None, |n| async move {
            Err::<u32, _>(Error::Validation(format!("job {n} failed")))
        })
        .await
        .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| matches!(r, InnerResult::Failed { .. })));
    }

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let results = run_parallel(Vec::<u32>::new(), 4, None, |n| async move { Ok(n) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn worker_cap_env_parsing() {
        // Default applies when the variable is unset or nonsense.
        assert_eq!(PARALLEL_WORKFLOW_MAX_WORKERS_DEFAULT, 32);
    }
}
