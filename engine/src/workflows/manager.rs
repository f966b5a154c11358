// Workflow Manager - The façade event producers talk to

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;
use vigil_shared::{Alert, CommentMention, Incident};

use super::definition::Workflow;
use super::executor::{RunState, WorkflowExecutor};
use super::matcher::TriggerMatcher;
use super::queue::{QueueFull, RunQueue, ScheduledRun};
use super::scheduler::Dispatcher;
use super::triggers::{EventPayload, TriggerKind};
use crate::config::EngineConfig;
use crate::error::ExecutionError;
use crate::mentions::mentions_from_comment;
use crate::notify::RealtimeNotifier;
use crate::providers::ProviderRegistry;
use crate::store::{EnrichmentStore, ResultStore, WorkflowStore};

/// Wires the matcher, queue, dispatcher, and executor together and exposes
/// the producer-facing entry points.
///
/// Constructed explicitly by the composition root; independent instances do
/// not share state. `insert_*` calls only evaluate triggers and enqueue, then
/// return; execution happens on the dispatcher's worker pool, so an event
/// producer never observes execution failures synchronously.
pub struct WorkflowManager {
    queue: Arc<RunQueue>,
    matcher: TriggerMatcher,
    executor: Arc<WorkflowExecutor>,
    dispatcher: Dispatcher,
    enrichments: Arc<dyn EnrichmentStore>,
    notifier: Option<Arc<dyn RealtimeNotifier>>,
}

impl WorkflowManager {
    pub fn new(
        config: EngineConfig,
        workflows: Arc<dyn WorkflowStore>,
        results: Arc<dyn ResultStore>,
        enrichments: Arc<dyn EnrichmentStore>,
        providers: ProviderRegistry,
    ) -> Self {
        let queue = Arc::new(RunQueue::new(config.run_queue_capacity));
        let executor = Arc::new(WorkflowExecutor::new(config.clone(), providers, results));
        let dispatcher = Dispatcher::new(config, queue.clone(), executor.clone(), workflows.clone());
        Self {
            queue,
            matcher: TriggerMatcher::new(workflows),
            executor,
            dispatcher,
            enrichments,
            notifier: None,
        }
    }

    /// Optional realtime collaborator; everything works without one.
    pub fn with_notifier(mut self, notifier: Arc<dyn RealtimeNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn start(&self) {
        self.dispatcher.start().await;
    }

    pub async fn stop(&self) {
        self.dispatcher.stop().await;
    }

    pub async fn is_running(&self) -> bool {
        self.dispatcher.is_running().await
    }

    /// Runs matched but not yet picked up by the dispatcher.
    pub async fn pending_runs(&self) -> usize {
        self.queue.len().await
    }

    /// An alert changed: schedule every workflow with a matching alert
    /// trigger.
    pub async fn insert_alert_event(&self, tenant_id: &str, alert: Alert) {
        let event = EventPayload::alert(alert);
        let runs = self
            .matcher
            .match_event(tenant_id, TriggerKind::Alert, None, &event, "alert")
            .await;
        self.enqueue_all(runs).await;
    }

    /// An incident went through a lifecycle transition. Enrichment overrides
    /// are merged onto the incident before trigger evaluation, so filters see
    /// the enriched fields.
    pub async fn insert_incident_event(
        &self,
        tenant_id: &str,
        incident: Incident,
        transition: &str,
    ) {
        let enrichment = match self.enrichments.get_enrichment(tenant_id, incident.id).await {
            Ok(Some(enrichment)) => enrichment,
            Ok(None) => serde_json::Map::new(),
            Err(e) => {
                warn!(tenant_id = %tenant_id, incident_id = %incident.id, error = %e,
                    "Failed to load incident enrichment, matching without it");
                serde_json::Map::new()
            }
        };
        let event = EventPayload::enriched_incident(incident, enrichment);
        let triggered_by = format!("incident:{transition}");
        let runs = self
            .matcher
            .match_event(
                tenant_id,
                TriggerKind::Incident,
                Some(transition),
                &event,
                &triggered_by,
            )
            .await;
        self.enqueue_all(runs).await;
    }

    /// A user was mentioned or assigned; the payload is the mention mapping
    /// (`incident_id`, `comment_id`, `mentioned_user`, `mentioned_by`,
    /// `comment_text`).
    pub async fn insert_user_assigned_event(
        &self,
        tenant_id: &str,
        mention_event: serde_json::Map<String, Value>,
    ) {
        let event = EventPayload::mapping(mention_event);
        let runs = self
            .matcher
            .match_event(tenant_id, TriggerKind::UserAssigned, None, &event, "user_assigned")
            .await;
        self.enqueue_all(runs).await;
    }

    /// Extract `@user` mentions from an incident comment, publish one
    /// realtime event per mention, and insert one user-assigned event per
    /// mention. Returns the mention records for the caller to persist.
    pub async fn process_comment_mentions(
        &self,
        tenant_id: &str,
        incident_id: Uuid,
        comment_id: Uuid,
        author: &str,
        text: &str,
    ) -> Vec<CommentMention> {
        let mentions = mentions_from_comment(tenant_id, incident_id, comment_id, author, text);
        for mention in &mentions {
            if let Some(notifier) = &self.notifier {
                let payload = serde_json::to_value(mention).unwrap_or(Value::Null);
                notifier.publish(tenant_id, "user-mentioned", payload).await;
            }

            let mut event = serde_json::Map::new();
            event.insert("incident_id".to_string(), json!(incident_id));
            event.insert("comment_id".to_string(), json!(comment_id));
            event.insert("mentioned_user".to_string(), json!(mention.user_id));
            event.insert("mentioned_by".to_string(), json!(author));
            event.insert("comment_text".to_string(), json!(text));
            self.insert_user_assigned_event(tenant_id, event).await;
        }
        mentions
    }

    /// Manual/CLI path: execute the given workflows sequentially, bypassing
    /// the queue and dispatcher, and return each workflow's error list.
    /// Unlike event producers, this caller does observe hard failures.
    pub async fn run_batch(
        &self,
        workflows: Vec<Arc<Workflow>>,
    ) -> Result<Vec<Vec<String>>, ExecutionError> {
        let mut outcomes = Vec::with_capacity(workflows.len());
        for workflow in workflows {
            let run = ScheduledRun::new(
                workflow,
                "manual",
                EventPayload::mapping(serde_json::Map::new()),
            );
            outcomes.push(self.executor.execute(&run).await?);
        }
        Ok(outcomes)
    }

    async fn enqueue_all(&self, runs: Vec<ScheduledRun>) {
        for run in runs {
            debug!(workflow_id = %run.workflow_id, triggered_by = %run.triggered_by,
                state = RunState::Pending.as_str(), "Workflow run scheduled");
            if let Err(QueueFull(run)) = self.queue.enqueue(run).await {
                warn!(workflow_id = %run.workflow_id, "Run queue full, dropping run");
            }
        }
    }
}
