// Dispatcher - Background loop feeding queued runs to a bounded worker pool

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::{RunState, WorkflowExecutor};
use super::queue::{QueueFull, RunQueue, ScheduledRun};
use super::triggers::EventPayload;
use crate::config::EngineConfig;
use crate::store::{StoreError, WorkflowStore};

/// Owns the dispatch loop lifecycle: `Stopped -> Running` on `start`,
/// `Running -> Stopped` on `stop`, both idempotent. Each tick drains the run
/// queue into the worker pool and enqueues interval-triggered workflows whose
/// period has elapsed.
pub struct Dispatcher {
    config: EngineConfig,
    queue: Arc<RunQueue>,
    executor: Arc<WorkflowExecutor>,
    workflows: Arc<dyn WorkflowStore>,
    running: Mutex<Option<DispatchLoop>>,
}

struct DispatchLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Dispatcher {
    pub fn new(
        config: EngineConfig,
        queue: Arc<RunQueue>,
        executor: Arc<WorkflowExecutor>,
        workflows: Arc<dyn WorkflowStore>,
    ) -> Self {
        Self {
            config,
            queue,
            executor,
            workflows,
            running: Mutex::new(None),
        }
    }

    /// Launch the dispatch loop. A second call while running is a no-op.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            info!("Dispatcher already running, ignoring start");
            return;
        }
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(dispatch_loop(
            self.config.clone(),
            self.queue.clone(),
            self.executor.clone(),
            self.workflows.clone(),
            cancel.clone(),
        ));
        *running = Some(DispatchLoop { cancel, handle });
        info!(tick_ms = self.config.tick_interval.as_millis() as u64,
            workers = self.config.max_concurrent_runs, "Dispatcher started");
    }

    /// Halt the loop and release it. In-flight runs finish and persist before
    /// this returns; queued-but-undispatched runs stay queued.
    pub async fn stop(&self) {
        let stopped = self.running.lock().await.take();
        let Some(dispatch) = stopped else {
            info!("Dispatcher already stopped, ignoring stop");
            return;
        };
        dispatch.cancel.cancel();
        if let Err(e) = dispatch.handle.await {
            error!(error = %e, "Dispatch loop task did not shut down cleanly");
        }
        info!("Dispatcher stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.running.lock().await.is_some()
    }
}

async fn dispatch_loop(
    config: EngineConfig,
    queue: Arc<RunQueue>,
    executor: Arc<WorkflowExecutor>,
    workflows: Arc<dyn WorkflowStore>,
    cancel: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));
    let mut workers: JoinSet<()> = JoinSet::new();
    let mut last_enqueued: HashMap<(String, String), Instant> = HashMap::new();
    let mut tick = tokio::time::interval(config.tick_interval);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tick.tick() => {
                while workers.try_join_next().is_some() {}
                enqueue_due_interval_runs(&workflows, &queue, &mut last_enqueued).await;
                dispatch_drained(&queue, &executor, &semaphore, &mut workers).await;
            }
        }
    }

    // Graceful shutdown: let in-flight runs finish and persist.
    while workers.join_next().await.is_some() {}
}

/// Drain the queue and submit each run to the pool. When no permit is
/// available the run and everything drained after it go back to the front of
/// the queue for the next tick: backpressure, not loss.
async fn dispatch_drained(
    queue: &Arc<RunQueue>,
    executor: &Arc<WorkflowExecutor>,
    semaphore: &Arc<Semaphore>,
    workers: &mut JoinSet<()>,
) {
    let mut drained = queue.drain_all().await.into_iter();
    while let Some(run) = drained.next() {
        match semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                let executor = executor.clone();
                workers.spawn(async move {
                    let workflow_id = run.workflow_id.clone();
                    if let Err(e) = executor.execute(&run).await {
                        warn!(workflow_id = %workflow_id, error = %e,
                            "Workflow run failed");
                    }
                    drop(permit);
                });
            }
            Err(_) => {
                debug!(state = RunState::Pending.as_str(),
                    "Worker pool saturated, re-enqueueing for next tick");
                let mut rest: Vec<ScheduledRun> = std::iter::once(run).chain(drained).collect();
                while let Some(run) = rest.pop() {
                    queue.requeue_front(run).await;
                }
                return;
            }
        }
    }
}

/// The interval-trigger source: enqueue every interval workflow whose period
/// elapsed since its last enqueue. A workflow never seen before runs on the
/// first tick.
async fn enqueue_due_interval_runs(
    workflows: &Arc<dyn WorkflowStore>,
    queue: &Arc<RunQueue>,
    last_enqueued: &mut HashMap<(String, String), Instant>,
) {
    let definitions = match workflows.interval_workflows().await {
        Ok(definitions) => definitions,
        Err(e) => {
            error!(error = %e, "Failed to list interval workflows");
            return;
        }
    };

    for definition in definitions {
        let Some(seconds) = definition.interval_seconds() else {
            continue;
        };
        let key = (definition.tenant_id.clone(), definition.id.clone());
        let due = match last_enqueued.get(&key) {
            None => true,
            Some(last) => last.elapsed() >= Duration::from_secs(seconds),
        };
        if !due {
            continue;
        }

        let workflow = match workflows.resolve(&definition.tenant_id, &definition.id).await {
            Ok(workflow) => workflow,
            Err(StoreError::ProviderNotConfigured { provider }) => {
                warn!(workflow_id = %definition.id, provider = %provider,
                    "Provider not configured for interval workflow, skipping");
                continue;
            }
            Err(e) => {
                error!(workflow_id = %definition.id, error = %e,
                    "Failed to resolve interval workflow, skipping");
                continue;
            }
        };

        let run = ScheduledRun::new(workflow, "interval", EventPayload::mapping(serde_json::Map::new()));
        match queue.enqueue(run).await {
            Ok(()) => {
                debug!(workflow_id = %definition.id, "Interval workflow enqueued");
                last_enqueued.insert(key, Instant::now());
            }
            Err(QueueFull(run)) => {
                // Not recorded as enqueued, so the next tick retries.
                warn!(workflow_id = %run.workflow_id,
                    "Run queue full, interval run deferred to next tick");
            }
        }
    }
}
