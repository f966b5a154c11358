// Workflow Definitions - Stored workflow documents and their executable form

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::triggers::{TriggerKind, TriggerSpec};

/// One executable unit inside a workflow. `provider` names the runtime that
/// performs the side effect; `parameters` are opaque to the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowStep {
    pub name: String,
    pub provider: String,
    #[serde(default)]
    pub parameters: Value,
}

impl WorkflowStep {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider: provider.into(),
            parameters: Value::Null,
        }
    }

    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

/// The resolved, executable form of a workflow as the store hands it to the
/// engine. Read-only here; editing happens outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    /// Steps run first, in order, then actions. Both share one result
    /// namespace.
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub actions: Vec<WorkflowStep>,
    /// Compensation action invoked when the run produced errors.
    #[serde(default)]
    pub on_failure: Option<WorkflowStep>,
}

impl Workflow {
    pub fn new(
        id: impl Into<String>,
        tenant_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            name: name.into(),
            disabled: false,
            triggers: Vec::new(),
            steps: Vec::new(),
            actions: Vec::new(),
            on_failure: None,
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerSpec) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn with_action(mut self, action: WorkflowStep) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_on_failure(mut self, action: WorkflowStep) -> Self {
        self.on_failure = Some(action);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Distinct provider types referenced by any step, action, or the
    /// compensation action. The tier policy is checked against this set.
    pub fn provider_types(&self) -> Vec<String> {
        let mut types = Vec::new();
        let all = self
            .steps
            .iter()
            .chain(self.actions.iter())
            .chain(self.on_failure.iter());
        for step in all {
            if !types.contains(&step.provider) {
                types.push(step.provider.clone());
            }
        }
        types
    }

    /// The listing handle the store exposes for this workflow.
    pub fn definition(&self) -> WorkflowDefinition {
        WorkflowDefinition {
            id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            name: self.name.clone(),
            disabled: self.disabled,
            triggers: self.triggers.clone(),
            provider_types: self.provider_types(),
        }
    }
}

/// Listing handle returned by `WorkflowStore::list_workflows`: enough to
/// decide whether a workflow is worth resolving, nothing executable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub triggers: Vec<TriggerSpec>,
    #[serde(default)]
    pub provider_types: Vec<String>,
}

impl WorkflowDefinition {
    /// Period of the first interval-kind trigger, if any. The dispatcher's
    /// interval source keys off this.
    pub fn interval_seconds(&self) -> Option<u64> {
        self.triggers
            .iter()
            .find(|t| t.kind == TriggerKind::Interval)
            .and_then(|t| t.interval)
    }
}
