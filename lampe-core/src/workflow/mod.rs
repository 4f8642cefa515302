//! Event-typed workflow runtime.
//!
//! A workflow is a set of registered steps over a single event enum `E`.
//! Each step declares which events it accepts and returns zero or more
//! follow-up events; the runtime routes emitted events to the accepting
//! step, running up to `num_workers` invocations of a step concurrently.
//!
//! A run starts when the start event is submitted and terminates when a
//! handler returns an event matching the stop predicate; that event is the
//! run's result. The global timeout cancels in-flight steps at their next
//! suspension point. An unhandled step error aborts the run.
//!
//! Ordering: a step with one worker observes events in emission order
//! (permits are granted FIFO). [`Context::collect_events`] is an unordered
//! multiset barrier.

pub mod agent;
pub mod memory;
pub mod parallel;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::debug;

use crate::errors::{Error, LampeResult, WorkflowError};

type BoxedStepFuture<E> = Pin<Box<dyn Future<Output = LampeResult<Vec<E>>> + Send>>;
type StepHandler<E> = Arc<dyn Fn(Context<E>, E) -> BoxedStepFuture<E> + Send + Sync>;

struct StepDef<E> {
    name: &'static str,
    num_workers: usize,
    accepts: fn(&E) -> bool,
    handler: StepHandler<E>,
}

/// Shared per-run state handed to every step invocation.
pub struct Context<E> {
    tx: mpsc::UnboundedSender<E>,
    store: Arc<Mutex<HashMap<String, Box<dyn Any + Send>>>>,
    collectors: Arc<Mutex<HashMap<&'static str, Vec<E>>>>,
}

impl<E> Clone for Context<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            store: self.store.clone(),
            collectors: self.collectors.clone(),
        }
    }
}

impl<E: Send + 'static> Context<E> {
    fn new(tx: mpsc::UnboundedSender<E>) -> Self {
        Self {
            tx,
            store: Arc::new(Mutex::new(HashMap::new())),
            collectors: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Enqueues an event without awaiting a reply (fan-out).
    pub fn send_event(&self, event: E) {
        let _ = self.tx.send(event);
    }

    /// Stores a typed value in the run's context store.
    pub async fn set<T: Send + 'static>(&self, key: &str, value: T) {
        self.store.lock().await.insert(key.to_string(), Box::new(value));
    }

    /// Reads a typed value from the store by cloning it.
    pub async fn get<T: Clone + Send + 'static>(&self, key: &str) -> Option<T> {
        self.store
            .lock()
            .await
            .get(key)
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    /// Removes and returns a typed value from the store.
    pub async fn take<T: Send + 'static>(&self, key: &str) -> Option<T> {
        let boxed = self.store.lock().await.remove(key)?;
        boxed.downcast::<T>().ok().map(|b| *b)
    }

    /// Buffers `event` under `slot` and releases the whole batch once
    /// `expected` events have been gathered. Returns `None` until then.
    ///
    /// The released batch is a multiset: callers must not rely on order.
    pub async fn collect_events(&self, slot: &'static str, event: E, expected: usize) -> Option<Vec<E>> {
        let mut collectors = self.collectors.lock().await;
        let buffer = collectors.entry(slot).or_default();
        buffer.push(event);
        if buffer.len() >= expected {
            Some(collectors.remove(slot).unwrap_or_default())
        } else {
            None
        }
    }
}

/// Builder registering `(event kind → handler)` steps.
pub struct WorkflowBuilder<E> {
    steps: Vec<StepDef<E>>,
    is_stop: fn(&E) -> bool,
    timeout: Option<Duration>,
}

impl<E: Send + fmt::Debug + 'static> WorkflowBuilder<E> {
    /// Registers a single-worker step.
    pub fn step<F, Fut>(self, name: &'static str, accepts: fn(&E) -> bool, handler: F) -> Self
    where
        F: Fn(Context<E>, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LampeResult<Vec<E>>> + Send + 'static,
    {
        self.step_with_workers(name, 1, accepts, handler)
    }

    /// Registers a step with a concurrency cap.
    pub fn step_with_workers<F, Fut>(
        mut self,
        name: &'static str,
        num_workers: usize,
        accepts: fn(&E) -> bool,
        handler: F,
    ) -> Self
    where
        F: Fn(Context<E>, E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = LampeResult<Vec<E>>> + Send + 'static,
    {
        self.steps.push(StepDef {
            name,
            num_workers: num_workers.max(1),
            accepts,
            handler: Arc::new(move |ctx, ev| Box::pin(handler(ctx, ev))),
        });
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Workflow<E> {
        Workflow {
            steps: self.steps,
            is_stop: self.is_stop,
            timeout: self.timeout,
        }
    }
}

/// A registered step set plus run policy.
pub struct Workflow<E> {
    steps: Vec<StepDef<E>>,
    is_stop: fn(&E) -> bool,
    timeout: Option<Duration>,
}

impl<E: Send + fmt::Debug + 'static> Workflow<E> {
    /// Starts a builder; `is_stop` recognizes the terminating event.
    pub fn builder(is_stop: fn(&E) -> bool) -> WorkflowBuilder<E> {
        WorkflowBuilder {
            steps: Vec::new(),
            is_stop,
            timeout: None,
        }
    }

    /// Runs the workflow to completion and returns the stop event.
    pub async fn run(&self, start: E) -> LampeResult<E> {
        match self.timeout {
            Some(deadline) => tokio::time::timeout(deadline, self.run_inner(start))
                .await
                .map_err(|_| Error::Workflow(WorkflowError::Timeout(deadline.as_secs())))?,
            None => self.run_inner(start).await,
        }
    }

    async fn run_inner(&self, start: E) -> LampeResult<E> {
        let (tx, mut rx) = mpsc::unbounded_channel::<E>();
        let ctx = Context::new(tx.clone());
        let semaphores: Vec<Arc<Semaphore>> = self
            .steps
            .iter()
            .map(|s| Arc::new(Semaphore::new(s.num_workers)))
            .collect();
        let mut tasks: JoinSet<LampeResult<Vec<E>>> = JoinSet::new();

        tx.send(start).expect("receiver alive");

        loop {
            // Drain and dispatch everything queued before blocking.
            while let Ok(event) = rx.try_recv() {
                if (self.is_stop)(&event) {
                    tasks.abort_all();
                    return Ok(event);
                }
                let Some(idx) = self.steps.iter().position(|s| (s.accepts)(&event)) else {
                    tasks.abort_all();
                    return Err(WorkflowError::UnhandledEvent(format!("{event:?}")).into());
                };
                let step = &self.steps[idx];
                let semaphore = semaphores[idx].clone();
                let handler = step.handler.clone();
                let name = step.name;
                let step_ctx = ctx.clone();
                debug!(step = name, "dispatching event");
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore open");
                    handler(step_ctx, event).await.map_err(|e| {
                        Error::Workflow(WorkflowError::Step {
                            step: name,
                            source: Box::new(e),
                        })
                    })
                });
            }

            if tasks.is_empty() {
                // Nothing queued, nothing running, no stop event seen.
                return Err(WorkflowError::Stalled.into());
            }

            match tasks.join_next().await {
                Some(Ok(Ok(events))) => {
                    for event in events {
                        let _ = tx.send(event);
                    }
                }
                Some(Ok(Err(e))) => {
                    tasks.abort_all();
                    return Err(e);
                }
                Some(Err(join_err)) => {
                    tasks.abort_all();
                    return Err(WorkflowError::Join(join_err.to_string()).into());
                }
                None => return Err(WorkflowError::Stalled.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum Ev {
        Start(u32),
        Doubled(u32),
        Stop(u32),
    }

    fn is_stop(ev: &Ev) -> bool {
        matches!(ev, Ev::Stop(_))
    }

    #[tokio::test]
    async fn routes_events_through_steps_to_stop() {
        let wf = Workflow::builder(is_stop)
            .step("double", |e| matches!(e, Ev::Start(_)), |_ctx, ev| async move {
                let Ev::Start(n) = ev else { unreachable!() };
                Ok(vec![Ev::Doubled(n * 2)])
            })
            .step("finish", |e| matches!(e, Ev::Doubled(_)), |_ctx, ev| async move {
                let Ev::Doubled(n) = ev else { unreachable!() };
                Ok(vec![Ev::Stop(n + 1)])
            })
            .build();
        let result = wf.run(Ev::Start(20)).await.unwrap();
        assert!(matches!(result, Ev::Stop(41)));
    }

    #[tokio::test]
    async fn fan_out_collects_all_results() {
        let wf = Workflow::builder(is_stop)
            .step("scatter", |e| matches!(e, Ev::Start(_)), |ctx, ev| async move {
                let Ev::Start(n) = ev else { unreachable!() };
                ctx.set("expected", n as usize).await;
                for i in 0..n {
                    ctx.send_event(Ev::Doubled(i * 2));
                }
                Ok(vec![])
            })
            .step_with_workers("gather", 4, |e| matches!(e, Ev::Doubled(_)), |ctx, ev| async move {
                let expected: usize = ctx.get("expected").await.expect("set by scatter");
                match ctx.collect_events("gather", ev, expected).await {
                    Some(batch) => {
                        let sum = batch
                            .iter()
                            .map(|e| match e {
                                Ev::Doubled(v) => *v,
                                _ => 0,
                            })
                            .sum();
                        Ok(vec![Ev::Stop(sum)])
                    }
                    None => Ok(vec![]),
                }
            })
            .build();
        let result = wf.run(Ev::Start(5)).await.unwrap();
        // 0 + 2 + 4 + 6 + 8
        assert!(matches!(result, Ev::Stop(20)));
    }

    #[tokio::test]
    async fn step_error_aborts_the_run() {
        let wf = Workflow::builder(is_stop)
            .step("boom", |e| matches!(e, Ev::Start(_)), |_ctx, _ev| async move {
                Err(Error::Validation("boom".into()))
            })
            .build();
        let err = wf.run(Ev::Start(1)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Workflow(WorkflowError::Step { step: "boom", .. })
        ));
    }

    #[tokio::test]
    async fn unhandled_event_is_an_error() {
        let wf = Workflow::builder(is_stop)
            .step("start-only", |e| matches!(e, Ev::Start(_)), |_ctx, _ev| async move {
                Ok(vec![Ev::Doubled(1)])
            })
            .build();
        let err = wf.run(Ev::Start(1)).await.unwrap_err();
        assert!(matches!(err, Error::Workflow(WorkflowError::UnhandledEvent(_))));
    }

    #[tokio::test]
    async fn timeout_cancels_in_flight_steps() {
        let wf = Workflow::builder(is_stop)
            .step("sleepy", |e| matches!(e, Ev::Start(_)), |_ctx, _ev| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(vec![Ev::Stop(0)])
            })
            .timeout(Some(Duration::from_millis(50)))
            .build();
        let err = wf.run(Ev::Start(1)).await.unwrap_err();
        assert!(matches!(err, Error::Workflow(WorkflowError::Timeout(_))));
    }

    #[tokio::test]
    async fn run_without_stop_event_stalls() {
        let wf = Workflow::builder(is_stop)
            .step("sink", |e| matches!(e, Ev::Start(_)), |_ctx, _ev| async move { Ok(vec![]) })
            .build();
        let err = wf.run(Ev::Start(1)).await.unwrap_err();
        assert!(matches!(err, Error::Workflow(WorkflowError::Stalled)));
    }

    #[tokio::test]
    async fn context_store_round_trips_typed_values() {
        let (tx, _rx) = mpsc::unbounded_channel::<Ev>();
        let ctx = Context::new(tx);
        ctx.set("k", 7usize).await;
        assert_eq!(ctx.get::<usize>("k").await, Some(7));
        assert_eq!(ctx.get::<String>("k").await, None);
        assert_eq!(ctx.take::<usize>("k").await, Some(7));
        assert_eq!(ctx.get::<usize>("k").await, None);
    }
}
