// Webhook Provider - HTTP callback runtime

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::debug;

use super::{InvocationContext, ProviderRuntime};
use crate::error::StepError;

/// Sends the step's parameters and run context to a configured URL.
///
/// Parameters: `url` (required), `method` (`GET` or `POST`, default `POST`),
/// `payload` (optional body override; defaults to an envelope carrying the
/// run context and event).
pub struct WebhookProvider {
    client: Client,
}

impl WebhookProvider {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for WebhookProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderRuntime for WebhookProvider {
    async fn invoke(
        &self,
        context: &InvocationContext,
        parameters: &Value,
    ) -> Result<Value, StepError> {
        let url = parameters["url"]
            .as_str()
            .ok_or_else(|| StepError::fatal("Webhook step is missing a url parameter"))?;
        let method = parameters["method"].as_str().unwrap_or("POST");

        let body = match &parameters["payload"] {
            Value::Null => json!({
                "tenant_id": context.tenant_id,
                "workflow_id": context.workflow_id,
                "execution_id": context.execution_id,
                "step": context.step_name,
                "triggered_by": context.triggered_by,
                "event": context.event,
            }),
            payload => payload.clone(),
        };

        let response = match method.to_uppercase().as_str() {
            "GET" => self.client.get(url).send().await,
            "POST" => self.client.post(url).json(&body).send().await,
            other => {
                return Err(StepError::fatal(format!(
                    "Unsupported webhook method: {other}"
                )));
            }
        }
        .map_err(|e| StepError::new(format!("Webhook request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StepError::new(format!("Webhook returned {status}")));
        }
        debug!(url = %url, status = status.as_u16(), "Webhook delivered");
        Ok(json!({ "url": url, "status": status.as_u16() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context() -> InvocationContext {
        InvocationContext {
            tenant_id: "acme".to_string(),
            workflow_id: "wf-1".to_string(),
            execution_id: Uuid::new_v4(),
            step_name: "notify".to_string(),
            triggered_by: "alert".to_string(),
            event: json!({ "severity": "critical" }),
        }
    }

    #[tokio::test]
    async fn test_posts_context_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let provider = WebhookProvider::new();
        let out = provider
            .invoke(&context(), &json!({ "url": format!("{}/hook", server.uri()) }))
            .await
            .unwrap();
        assert_eq!(out["status"], 200);
    }

    #[tokio::test]
    async fn test_server_error_is_non_fatal_step_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = WebhookProvider::new();
        let err = provider
            .invoke(&context(), &json!({ "url": server.uri() }))
            .await
            .unwrap_err();
        assert!(!err.fatal);
        assert!(err.message.contains("500"));
    }

    #[tokio::test]
    async fn test_missing_url_is_fatal() {
        let provider = WebhookProvider::new();
        let err = provider.invoke(&context(), &json!({})).await.unwrap_err();
        assert!(err.fatal);
    }
}
