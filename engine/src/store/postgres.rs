// Postgres Stores - sqlx-backed implementations of the store boundary
//
// Workflow documents are stored whole as JSONB and deserialized on read, so
// the schema never trails the document shape. Execution results land one row
// per run.

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::{EnrichmentStore, ResultStore, StoreError, StoreResult, WorkflowStore};
use crate::workflows::{ExecutionResult, Workflow, WorkflowDefinition};

/// Apply this crate's schema: workflows, tenant_providers,
/// workflow_executions, incident_enrichments.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub struct PgWorkflowStore {
    pool: PgPool,
}

impl PgWorkflowStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn definitions_from_rows(
        rows: Vec<(String, String, serde_json::Value)>,
    ) -> Vec<WorkflowDefinition> {
        rows.into_iter()
            .filter_map(|(id, tenant_id, document)| {
                match serde_json::from_value::<Workflow>(document) {
                    Ok(workflow) => Some(workflow.definition()),
                    Err(e) => {
                        warn!(workflow_id = %id, tenant_id = %tenant_id, error = %e,
                            "Skipping workflow with unreadable stored document");
                        None
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl WorkflowStore for PgWorkflowStore {
    async fn list_workflows(&self, tenant_id: &str) -> StoreResult<Vec<WorkflowDefinition>> {
        let rows = sqlx::query_as::<_, (String, String, serde_json::Value)>(
            r#"
            SELECT id, tenant_id, document
            FROM workflows
            WHERE tenant_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::definitions_from_rows(rows))
    }

    async fn resolve(&self, tenant_id: &str, workflow_id: &str) -> StoreResult<Arc<Workflow>> {
        let row = sqlx::query_as::<_, (serde_json::Value,)>(
            r#"
            SELECT document
            FROM workflows
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((document,)) = row else {
            return Err(StoreError::NotFound {
                workflow_id: workflow_id.to_string(),
            });
        };
        let workflow: Workflow = serde_json::from_value(document)?;

        let configured: HashSet<String> = sqlx::query_as::<_, (String,)>(
            "SELECT provider_type FROM tenant_providers WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(provider_type,)| provider_type)
        .collect();

        for provider in workflow.provider_types() {
            if !configured.contains(&provider) {
                return Err(StoreError::ProviderNotConfigured { provider });
            }
        }

        Ok(Arc::new(workflow))
    }

    async fn interval_workflows(&self) -> StoreResult<Vec<WorkflowDefinition>> {
        let rows = sqlx::query_as::<_, (String, String, serde_json::Value)>(
            r#"
            SELECT id, tenant_id, document
            FROM workflows
            WHERE disabled = FALSE
              AND document -> 'triggers' @> '[{"kind": "interval"}]'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(Self::definitions_from_rows(rows))
    }
}

pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn save_results(
        &self,
        tenant_id: &str,
        execution_id: Uuid,
        result: &ExecutionResult,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_executions (execution_id, tenant_id, workflow_id, results, errors)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(execution_id)
        .bind(tenant_id)
        .bind(&result.workflow_id)
        .bind(serde_json::to_value(&result.results)?)
        .bind(&result.errors)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgEnrichmentStore {
    pool: PgPool,
}

impl PgEnrichmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnrichmentStore for PgEnrichmentStore {
    async fn get_enrichment(
        &self,
        tenant_id: &str,
        incident_id: Uuid,
    ) -> StoreResult<Option<serde_json::Map<String, serde_json::Value>>> {
        let row = sqlx::query_as::<_, (serde_json::Value,)>(
            "SELECT data FROM incident_enrichments WHERE tenant_id = $1 AND incident_id = $2",
        )
        .bind(tenant_id)
        .bind(incident_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(data,)| match data {
            serde_json::Value::Object(map) => Some(map),
            other => {
                warn!(tenant_id = %tenant_id, incident_id = %incident_id, data = %other,
                    "Ignoring non-object enrichment row");
                None
            }
        }))
    }
}
