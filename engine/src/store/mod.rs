// Store Boundary - Persistence collaborators the engine consumes
//
// The engine never owns workflow documents, execution records, or incident
// enrichments; it talks to them through these traits. Two implementations
// ship: in-memory (tests, development composition roots) and Postgres.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::workflows::{ExecutionResult, Workflow, WorkflowDefinition};

pub use memory::{MemoryEnrichmentStore, MemoryResultStore, MemoryWorkflowStore};
pub use postgres::{PgEnrichmentStore, PgResultStore, PgWorkflowStore};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The workflow references a provider type the tenant has not configured.
    /// The matcher skips such workflows with a warning instead of failing the
    /// whole pass.
    #[error("Provider {provider} is not configured")]
    ProviderNotConfigured { provider: String },
    #[error("Workflow {workflow_id} not found")]
    NotFound { workflow_id: String },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Source of workflow definitions, scoped per tenant.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Every workflow handle for one tenant, including disabled ones.
    async fn list_workflows(&self, tenant_id: &str) -> StoreResult<Vec<WorkflowDefinition>>;

    /// Resolve a handle into its executable form. Distinguishes
    /// `ProviderNotConfigured` from other failures so the matcher can skip
    /// with a warning rather than an error.
    async fn resolve(&self, tenant_id: &str, workflow_id: &str) -> StoreResult<Arc<Workflow>>;

    /// Handles of every enabled workflow with an interval trigger, across
    /// all tenants. Feeds the dispatcher's interval source.
    async fn interval_workflows(&self) -> StoreResult<Vec<WorkflowDefinition>>;
}

/// Sink for aggregated run results.
#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save_results(
        &self,
        tenant_id: &str,
        execution_id: Uuid,
        result: &ExecutionResult,
    ) -> StoreResult<()>;
}

/// Read-only source of incident enrichment overrides.
#[async_trait]
pub trait EnrichmentStore: Send + Sync {
    async fn get_enrichment(
        &self,
        tenant_id: &str,
        incident_id: Uuid,
    ) -> StoreResult<Option<serde_json::Map<String, serde_json::Value>>>;
}
