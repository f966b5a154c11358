// Trigger Matcher - Decides which workflows an event schedules

use std::sync::Arc;
use tracing::{debug, error, warn};

use super::filters::evaluate_filters;
use super::queue::ScheduledRun;
use super::triggers::{EventPayload, TriggerKind};
use crate::store::{StoreError, WorkflowStore};

/// Evaluates one event against every workflow of a tenant and constructs a
/// `ScheduledRun` per match. A matching pass never fails as a whole:
/// workflows that cannot be listed, resolved, or evaluated are skipped where
/// they break.
pub struct TriggerMatcher {
    store: Arc<dyn WorkflowStore>,
}

impl TriggerMatcher {
    pub fn new(store: Arc<dyn WorkflowStore>) -> Self {
        Self { store }
    }

    /// One matching pass. `transition` is only read for incident events;
    /// `triggered_by` is stamped onto every constructed run.
    ///
    /// A workflow is scheduled when any of its kind-matching triggers (for
    /// incidents, further narrowed to triggers subscribed to the transition)
    /// passes its filters; the first passing trigger short-circuits the rest.
    pub async fn match_event(
        &self,
        tenant_id: &str,
        kind: TriggerKind,
        transition: Option<&str>,
        event: &EventPayload,
        triggered_by: &str,
    ) -> Vec<ScheduledRun> {
        let definitions = match self.store.list_workflows(tenant_id).await {
            Ok(definitions) => definitions,
            Err(e) => {
                error!(tenant_id = %tenant_id, error = %e,
                    "Failed to list workflows, skipping matching pass");
                return Vec::new();
            }
        };

        let event_value = event.to_value();
        let mut runs = Vec::new();

        for definition in definitions {
            if definition.disabled {
                debug!(workflow_id = %definition.id, "Skipping disabled workflow");
                continue;
            }

            let workflow = match self.store.resolve(tenant_id, &definition.id).await {
                Ok(workflow) => workflow,
                Err(StoreError::ProviderNotConfigured { provider }) => {
                    warn!(workflow_id = %definition.id, provider = %provider,
                        "Provider not configured for workflow, skipping");
                    continue;
                }
                Err(e) => {
                    error!(workflow_id = %definition.id, error = %e,
                        "Failed to resolve workflow, skipping");
                    continue;
                }
            };

            let matched = workflow.triggers.iter().any(|trigger| {
                if trigger.kind != kind {
                    return false;
                }
                if kind == TriggerKind::Incident {
                    let Some(transition) = transition else {
                        return false;
                    };
                    if !trigger.events.iter().any(|e| e == transition) {
                        return false;
                    }
                }
                evaluate_filters(&trigger.filters, &event_value)
            });
            if !matched {
                continue;
            }

            debug!(workflow_id = %workflow.id, triggered_by = %triggered_by,
                "Workflow matched event");
            runs.push(ScheduledRun::new(workflow, triggered_by, event.clone()));
        }

        runs
    }
}
