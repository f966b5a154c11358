// In-Memory Stores - Store implementations for tests and development roots

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EnrichmentStore, ResultStore, StoreError, StoreResult, WorkflowStore};
use crate::workflows::{ExecutionResult, TriggerKind, Workflow, WorkflowDefinition};

/// Workflow source backed by a plain vector. Workflows are registered up
/// front; `mark_provider_unconfigured` simulates a tenant that never set up
/// an integration, which makes `resolve` fail the way the real store does.
#[derive(Default)]
pub struct MemoryWorkflowStore {
    workflows: RwLock<Vec<Arc<Workflow>>>,
    unconfigured_providers: RwLock<HashSet<String>>,
}

impl MemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_workflow(&self, workflow: Workflow) {
        self.workflows.write().await.push(Arc::new(workflow));
    }

    pub async fn mark_provider_unconfigured(&self, provider_type: impl Into<String>) {
        self.unconfigured_providers
            .write()
            .await
            .insert(provider_type.into());
    }
}

#[async_trait]
impl WorkflowStore for MemoryWorkflowStore {
    async fn list_workflows(&self, tenant_id: &str) -> StoreResult<Vec<WorkflowDefinition>> {
        let workflows = self.workflows.read().await;
        Ok(workflows
            .iter()
            .filter(|w| w.tenant_id == tenant_id)
            .map(|w| w.definition())
            .collect())
    }

    async fn resolve(&self, tenant_id: &str, workflow_id: &str) -> StoreResult<Arc<Workflow>> {
        let workflows = self.workflows.read().await;
        let workflow = workflows
            .iter()
            .find(|w| w.tenant_id == tenant_id && w.id == workflow_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                workflow_id: workflow_id.to_string(),
            })?;

        let unconfigured = self.unconfigured_providers.read().await;
        for provider in workflow.provider_types() {
            if unconfigured.contains(&provider) {
                return Err(StoreError::ProviderNotConfigured { provider });
            }
        }
        Ok(workflow)
    }

    async fn interval_workflows(&self) -> StoreResult<Vec<WorkflowDefinition>> {
        let workflows = self.workflows.read().await;
        Ok(workflows
            .iter()
            .filter(|w| !w.disabled)
            .filter(|w| w.triggers.iter().any(|t| t.kind == TriggerKind::Interval))
            .map(|w| w.definition())
            .collect())
    }
}

/// One persisted execution, as the memory result store keeps them.
#[derive(Debug, Clone)]
pub struct SavedExecution {
    pub tenant_id: String,
    pub execution_id: Uuid,
    pub result: ExecutionResult,
}

#[derive(Default)]
pub struct MemoryResultStore {
    executions: RwLock<Vec<SavedExecution>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<SavedExecution> {
        self.executions.read().await.clone()
    }

    pub async fn count(&self) -> usize {
        self.executions.read().await.len()
    }
}

#[async_trait]
impl ResultStore for MemoryResultStore {
    async fn save_results(
        &self,
        tenant_id: &str,
        execution_id: Uuid,
        result: &ExecutionResult,
    ) -> StoreResult<()> {
        self.executions.write().await.push(SavedExecution {
            tenant_id: tenant_id.to_string(),
            execution_id,
            result: result.clone(),
        });
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryEnrichmentStore {
    rows: RwLock<HashMap<(String, Uuid), serde_json::Map<String, serde_json::Value>>>,
}

impl MemoryEnrichmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_enrichment(
        &self,
        tenant_id: impl Into<String>,
        incident_id: Uuid,
        data: serde_json::Map<String, serde_json::Value>,
    ) {
        self.rows
            .write()
            .await
            .insert((tenant_id.into(), incident_id), data);
    }
}

#[async_trait]
impl EnrichmentStore for MemoryEnrichmentStore {
    async fn get_enrichment(
        &self,
        tenant_id: &str,
        incident_id: Uuid,
    ) -> StoreResult<Option<serde_json::Map<String, serde_json::Value>>> {
        let rows = self.rows.read().await;
        Ok(rows.get(&(tenant_id.to_string(), incident_id)).cloned())
    }
}
