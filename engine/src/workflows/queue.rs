// Run Queue - Hand-off point between event producers and the dispatcher

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::definition::Workflow;
use super::triggers::EventPayload;

/// A queued, not-yet-executed instance of "run workflow W for tenant T
/// because of event E". Never persisted; loss on process crash is accepted.
#[derive(Debug, Clone)]
pub struct ScheduledRun {
    pub workflow: Arc<Workflow>,
    pub workflow_id: String,
    pub tenant_id: String,
    /// Trigger kind string, or `incident:<transition>` for incident events.
    pub triggered_by: String,
    pub event: EventPayload,
    pub enqueued_at: DateTime<Utc>,
}

impl ScheduledRun {
    pub fn new(
        workflow: Arc<Workflow>,
        triggered_by: impl Into<String>,
        event: EventPayload,
    ) -> Self {
        Self {
            workflow_id: workflow.id.clone(),
            tenant_id: workflow.tenant_id.clone(),
            workflow,
            triggered_by: triggered_by.into(),
            event,
            enqueued_at: Utc::now(),
        }
    }
}

/// Returned by `enqueue` when the queue is at capacity. Carries the run back
/// so the caller decides what to do with it.
#[derive(Error, Debug)]
#[error("Run queue is full")]
pub struct QueueFull(pub ScheduledRun);

/// Bounded FIFO of pending runs guarded by one lock. Producers append under
/// the lock; the dispatcher drains everything under the same lock. The lock
/// is never held across matching or execution.
pub struct RunQueue {
    runs: Mutex<VecDeque<ScheduledRun>>,
    capacity: usize,
}

impl RunQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            runs: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    /// Append one run. Rejects, returning the run, instead of blocking when
    /// the queue is at capacity.
    pub async fn enqueue(&self, run: ScheduledRun) -> Result<(), QueueFull> {
        let mut runs = self.runs.lock().await;
        if runs.len() >= self.capacity {
            return Err(QueueFull(run));
        }
        runs.push_back(run);
        Ok(())
    }

    /// Put a drained-but-unsubmittable run back at the front so the next tick
    /// retries it before newer work. Capacity is not re-checked: the run was
    /// already admitted once.
    pub async fn requeue_front(&self, run: ScheduledRun) {
        self.runs.lock().await.push_front(run);
    }

    /// Atomically remove and return everything currently queued, in order.
    pub async fn drain_all(&self) -> Vec<ScheduledRun> {
        let mut runs = self.runs.lock().await;
        runs.drain(..).collect()
    }

    pub async fn len(&self) -> usize {
        self.runs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.lock().await.is_empty()
    }
}
