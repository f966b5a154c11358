// Realtime Notifications - Optional push channel for engine side events

use async_trait::async_trait;
use serde_json::Value;

/// Push channel for events the platform surfaces live, such as a user being
/// mentioned. Implementations swallow their own delivery failures; the
/// engine behaves identically with none wired.
#[async_trait]
pub trait RealtimeNotifier: Send + Sync {
    /// Publish one named event to a tenant's private channel.
    async fn publish(&self, tenant_id: &str, event: &str, payload: Value);
}

/// Discards every event. Default for tests and headless deployments.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

#[async_trait]
impl RealtimeNotifier for NoopNotifier {
    async fn publish(&self, _tenant_id: &str, _event: &str, _payload: Value) {}
}
