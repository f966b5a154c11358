// Provider Runtimes - The pluggable step/action execution boundary
//
// The engine sequences and records step invocations; what a step actually
// does belongs to a provider runtime registered under its type name.

pub mod webhook;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::StepError;

pub use webhook::WebhookProvider;

/// Everything a runtime may need about the invocation it serves. Passed
/// explicitly per step; there is no ambient execution state.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub tenant_id: String,
    pub workflow_id: String,
    pub execution_id: Uuid,
    pub step_name: String,
    pub triggered_by: String,
    /// Canonical JSON view of the event that scheduled this run.
    pub event: Value,
}

/// One pluggable step/action runtime.
#[async_trait]
pub trait ProviderRuntime: Send + Sync {
    /// Perform one step or action. The returned value lands in the run's
    /// result map under the step's name.
    async fn invoke(
        &self,
        context: &InvocationContext,
        parameters: &Value,
    ) -> Result<Value, StepError>;
}

/// Named runtimes available to the executor.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ProviderRuntime>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        provider_type: impl Into<String>,
        runtime: Arc<dyn ProviderRuntime>,
    ) {
        self.providers.insert(provider_type.into(), runtime);
    }

    pub fn with_provider(
        mut self,
        provider_type: impl Into<String>,
        runtime: Arc<dyn ProviderRuntime>,
    ) -> Self {
        self.register(provider_type, runtime);
        self
    }

    pub fn get(&self, provider_type: &str) -> Option<Arc<dyn ProviderRuntime>> {
        self.providers.get(provider_type).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoRuntime;

    #[async_trait]
    impl ProviderRuntime for EchoRuntime {
        async fn invoke(
            &self,
            context: &InvocationContext,
            parameters: &Value,
        ) -> Result<Value, StepError> {
            Ok(json!({ "step": context.step_name, "parameters": parameters }))
        }
    }

    #[tokio::test]
    async fn test_registry_lookup() {
        let registry = ProviderRegistry::new().with_provider("echo", Arc::new(EchoRuntime));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("slack").is_none());

        let context = InvocationContext {
            tenant_id: "acme".to_string(),
            workflow_id: "wf-1".to_string(),
            execution_id: Uuid::new_v4(),
            step_name: "echo-step".to_string(),
            triggered_by: "manual".to_string(),
            event: Value::Null,
        };
        let runtime = registry.get("echo").unwrap();
        let out = runtime.invoke(&context, &json!({ "x": 1 })).await.unwrap();
        assert_eq!(out["step"], "echo-step");
    }
}
