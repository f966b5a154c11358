// Workflow Executor - Runs one scheduled run to completion

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, error, info, warn};
use uuid::Uuid;

use super::definition::WorkflowStep;
use super::queue::ScheduledRun;
use crate::config::EngineConfig;
use crate::error::{ExecutionError, StepError};
use crate::providers::{InvocationContext, ProviderRegistry};
use crate::store::ResultStore;

/// Lifecycle of a single run, surfaced in logs. `Failed` is terminal even
/// when compensation runs afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    CompensationRunning,
    CompensationDone,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Running => "running",
            RunState::Succeeded => "succeeded",
            RunState::Failed => "failed",
            RunState::CompensationRunning => "compensation_running",
            RunState::CompensationDone => "compensation_done",
        }
    }
}

/// Aggregated outcome of one run: step/action name to result payload, plus
/// the captured error list. Immutable once handed to the result store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub workflow_id: String,
    pub results: HashMap<String, Value>,
    pub errors: Vec<String>,
}

impl ExecutionResult {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            results: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Steps and actions share one namespace; the later insert wins.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if self.results.insert(name.clone(), value).is_some() {
            warn!(key = %name, "Duplicate step/action name in results, keeping the later one");
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Executes scheduled runs: tier gating, step/action sequencing, error
/// capture, `on_failure` compensation, aggregation, and persistence.
pub struct WorkflowExecutor {
    config: EngineConfig,
    providers: ProviderRegistry,
    results: Arc<dyn ResultStore>,
}

impl WorkflowExecutor {
    pub fn new(
        config: EngineConfig,
        providers: ProviderRegistry,
        results: Arc<dyn ResultStore>,
    ) -> Self {
        Self {
            config,
            providers,
            results,
        }
    }

    /// Run one scheduled run to completion.
    ///
    /// `Ok(errors)` is a completed run; an empty list is the success signal.
    /// `Err` is a hard abort: a policy violation before any step ran, or a
    /// persistence failure after execution. Nothing here panics across the
    /// dispatcher boundary.
    pub async fn execute(&self, run: &ScheduledRun) -> Result<Vec<String>, ExecutionError> {
        let execution_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "workflow_run",
            tenant_id = %run.tenant_id,
            workflow_id = %run.workflow_id,
            execution_id = %execution_id,
        );
        self.execute_inner(run, execution_id).instrument(span).await
    }

    async fn execute_inner(
        &self,
        run: &ScheduledRun,
        execution_id: Uuid,
    ) -> Result<Vec<String>, ExecutionError> {
        let workflow = &run.workflow;
        let started = Instant::now();
        debug!(state = RunState::Running.as_str(), triggered_by = %run.triggered_by,
            "Executing workflow");

        // Tier gating happens before any side-effecting step runs.
        if self.config.multi_tenant {
            let offenders: Vec<String> = workflow
                .provider_types()
                .into_iter()
                .filter(|p| self.config.restricted_providers.contains(p))
                .collect();
            if !offenders.is_empty() {
                let policy = ExecutionError::RestrictedProviders {
                    providers: offenders,
                };
                warn!(state = RunState::Failed.as_str(), error = %policy,
                    "Workflow aborted by provider policy");
                self.run_compensation(run, execution_id, &[policy.to_string()])
                    .await;
                return Err(policy);
            }
        }

        let mut errors = Vec::new();
        let mut step_results = Vec::new();
        let mut action_results = Vec::new();

        let keep_going = self
            .run_sequence(run, execution_id, &workflow.steps, &mut errors, &mut step_results)
            .await;
        if keep_going {
            self.run_sequence(run, execution_id, &workflow.actions, &mut errors, &mut action_results)
                .await;
        }

        let state = if errors.is_empty() {
            RunState::Succeeded
        } else {
            RunState::Failed
        };
        if state == RunState::Failed {
            self.run_compensation(run, execution_id, &errors).await;
        }

        // Actions first, steps second: a shared name resolves to the step.
        let mut result = ExecutionResult::new(&run.workflow_id);
        for (name, value) in action_results {
            result.insert(name, value);
        }
        for (name, value) in step_results {
            result.insert(name, value);
        }
        result.errors = errors.clone();

        info!(state = state.as_str(), workflow = %workflow.name,
            duration_ms = started.elapsed().as_millis() as u64,
            error_count = errors.len(), "Workflow run finished");

        if let Err(e) = self
            .results
            .save_results(&run.tenant_id, execution_id, &result)
            .await
        {
            error!(error = %e, "Failed to persist workflow results");
            return Err(ExecutionError::Results(e));
        }

        Ok(errors)
    }

    /// Invoke `steps` in order, collecting results and capturing errors.
    /// Returns false when a fatal step error stops the rest of the run.
    async fn run_sequence(
        &self,
        run: &ScheduledRun,
        execution_id: Uuid,
        steps: &[WorkflowStep],
        errors: &mut Vec<String>,
        results: &mut Vec<(String, Value)>,
    ) -> bool {
        for step in steps {
            match self
                .invoke_step(run, execution_id, step, &step.parameters)
                .await
            {
                Ok(value) => results.push((step.name.clone(), value)),
                Err(e) => {
                    warn!(step = %step.name, error = %e.message, fatal = e.fatal,
                        "Step failed");
                    errors.push(e.message);
                    if e.fatal {
                        return false;
                    }
                }
            }
        }
        true
    }

    async fn invoke_step(
        &self,
        run: &ScheduledRun,
        execution_id: Uuid,
        step: &WorkflowStep,
        parameters: &Value,
    ) -> Result<Value, StepError> {
        let Some(runtime) = self.providers.get(&step.provider) else {
            return Err(StepError::fatal(format!(
                "No runtime registered for provider {}",
                step.provider
            )));
        };
        let context = InvocationContext {
            tenant_id: run.tenant_id.clone(),
            workflow_id: run.workflow_id.clone(),
            execution_id,
            step_name: step.name.clone(),
            triggered_by: run.triggered_by.clone(),
            event: run.event.to_value(),
        };
        runtime.invoke(&context, parameters).await
    }

    /// Run the configured `on_failure` action with a synthesized message.
    /// Compensation failures are logged and never mask the original errors;
    /// its result is deliberately left out of the aggregate.
    async fn run_compensation(&self, run: &ScheduledRun, execution_id: Uuid, errors: &[String]) {
        let Some(action) = &run.workflow.on_failure else {
            return;
        };
        debug!(state = RunState::CompensationRunning.as_str(), action = %action.name,
            "Running on_failure action");
        let message = format!(
            "Workflow {} failed with errors: {}",
            run.workflow_id,
            errors.join(", ")
        );
        let parameters = json!({ "message": message });
        if let Err(e) = self
            .invoke_step(run, execution_id, action, &parameters)
            .await
        {
            error!(action = %action.name, error = %e.message, "on_failure action failed");
        }
        debug!(state = RunState::CompensationDone.as_str(), "on_failure action finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderRuntime;
    use crate::store::MemoryResultStore;
    use crate::workflows::triggers::EventPayload;
    use crate::workflows::{Workflow, WorkflowStep};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingProvider {
        invocations: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingProvider {
        async fn invocations(&self) -> Vec<(String, Value)> {
            self.invocations.lock().await.clone()
        }
    }

    #[async_trait]
    impl ProviderRuntime for RecordingProvider {
        async fn invoke(
            &self,
            context: &InvocationContext,
            parameters: &Value,
        ) -> Result<Value, StepError> {
            self.invocations
                .lock()
                .await
                .push((context.step_name.clone(), parameters.clone()));
            Ok(json!({ "step": context.step_name }))
        }
    }

    struct FailingProvider {
        fatal: bool,
    }

    #[async_trait]
    impl ProviderRuntime for FailingProvider {
        async fn invoke(
            &self,
            context: &InvocationContext,
            _parameters: &Value,
        ) -> Result<Value, StepError> {
            let message = format!("{} blew up", context.step_name);
            if self.fatal {
                Err(StepError::fatal(message))
            } else {
                Err(StepError::new(message))
            }
        }
    }

    fn manual_run(workflow: Workflow) -> ScheduledRun {
        ScheduledRun::new(
            Arc::new(workflow),
            "manual",
            EventPayload::mapping(serde_json::Map::new()),
        )
    }

    fn executor(
        config: EngineConfig,
        providers: ProviderRegistry,
    ) -> (WorkflowExecutor, Arc<MemoryResultStore>) {
        let results = Arc::new(MemoryResultStore::new());
        (
            WorkflowExecutor::new(config, providers, results.clone()),
            results,
        )
    }

    #[tokio::test]
    async fn test_success_persists_results_and_returns_no_errors() {
        let recorder = Arc::new(RecordingProvider::default());
        let registry = ProviderRegistry::new().with_provider("echo", recorder.clone());
        let (executor, results) = executor(EngineConfig::default(), registry);

        let workflow = Workflow::new("wf-1", "acme", "Echo twice")
            .with_step(WorkflowStep::new("first", "echo"))
            .with_action(WorkflowStep::new("second", "echo"));
        let errors = executor.execute(&manual_run(workflow)).await.unwrap();

        assert!(errors.is_empty());
        let saved = results.saved().await;
        assert_eq!(saved.len(), 1);
        assert!(saved[0].result.is_success());
        assert_eq!(saved[0].result.results["first"], json!({ "step": "first" }));
        assert_eq!(saved[0].result.results["second"], json!({ "step": "second" }));
    }

    #[tokio::test]
    async fn test_non_fatal_error_continues_and_runs_compensation_once() {
        let recorder = Arc::new(RecordingProvider::default());
        let registry = ProviderRegistry::new()
            .with_provider("echo", recorder.clone())
            .with_provider("broken", Arc::new(FailingProvider { fatal: false }));
        let (executor, results) = executor(EngineConfig::default(), registry);

        let workflow = Workflow::new("wf-err", "acme", "One bad step")
            .with_step(WorkflowStep::new("boom", "broken"))
            .with_step(WorkflowStep::new("after", "echo"))
            .with_on_failure(WorkflowStep::new("notify-oncall", "echo"));
        let errors = executor.execute(&manual_run(workflow)).await.unwrap();

        assert_eq!(errors, vec!["boom blew up"]);
        // The non-fatal error did not stop the later step.
        let invocations = recorder.invocations().await;
        assert!(invocations.iter().any(|(name, _)| name == "after"));

        let compensations: Vec<_> = invocations
            .iter()
            .filter(|(name, _)| name == "notify-oncall")
            .collect();
        assert_eq!(compensations.len(), 1);
        let message = compensations[0].1["message"].as_str().unwrap();
        assert!(message.contains("wf-err"));
        assert!(message.contains("boom blew up"));

        let saved = results.saved().await;
        assert_eq!(saved[0].result.errors, vec!["boom blew up"]);
    }

    #[tokio::test]
    async fn test_fatal_error_stops_remaining_steps_and_actions() {
        let recorder = Arc::new(RecordingProvider::default());
        let registry = ProviderRegistry::new()
            .with_provider("echo", recorder.clone())
            .with_provider("broken", Arc::new(FailingProvider { fatal: true }));
        let (executor, _results) = executor(EngineConfig::default(), registry);

        let workflow = Workflow::new("wf-fatal", "acme", "Stops early")
            .with_step(WorkflowStep::new("boom", "broken"))
            .with_step(WorkflowStep::new("never-step", "echo"))
            .with_action(WorkflowStep::new("never-action", "echo"));
        let errors = executor.execute(&manual_run(workflow)).await.unwrap();

        assert_eq!(errors.len(), 1);
        assert!(recorder.invocations().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_runtime_is_a_fatal_captured_error() {
        let (executor, results) = executor(EngineConfig::default(), ProviderRegistry::new());

        let workflow = Workflow::new("wf-none", "acme", "No runtime")
            .with_step(WorkflowStep::new("lonely", "unregistered"));
        let errors = executor.execute(&manual_run(workflow)).await.unwrap();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unregistered"));
        assert_eq!(results.count().await, 1);
    }

    #[tokio::test]
    async fn test_restricted_provider_aborts_before_any_step() {
        let recorder = Arc::new(RecordingProvider::default());
        let registry = ProviderRegistry::new()
            .with_provider("shell", recorder.clone())
            .with_provider("echo", recorder.clone());
        let config = EngineConfig {
            multi_tenant: true,
            ..EngineConfig::default()
        };
        let (executor, results) = executor(config, registry);

        let workflow = Workflow::new("wf-shell", "acme", "Restricted")
            .with_step(WorkflowStep::new("run-script", "shell"))
            .with_on_failure(WorkflowStep::new("tell-admin", "echo"));
        let err = executor.execute(&manual_run(workflow)).await.unwrap_err();

        assert!(matches!(err, ExecutionError::RestrictedProviders { .. }));
        assert!(err.to_string().contains("shell"));
        // Nothing persisted, no step ran, but compensation did.
        assert_eq!(results.count().await, 0);
        let invocations = recorder.invocations().await;
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "tell-admin");
    }

    #[tokio::test]
    async fn test_single_tenant_mode_allows_restricted_providers() {
        let recorder = Arc::new(RecordingProvider::default());
        let registry = ProviderRegistry::new().with_provider("shell", recorder.clone());
        let (executor, _results) = executor(EngineConfig::default(), registry);

        let workflow = Workflow::new("wf-shell", "acme", "Allowed here")
            .with_step(WorkflowStep::new("run-script", "shell"));
        let errors = executor.execute(&manual_run(workflow)).await.unwrap();
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn test_name_collision_keeps_the_step_result() {
        struct TaggingProvider;

        #[async_trait]
        impl ProviderRuntime for TaggingProvider {
            async fn invoke(
                &self,
                _context: &InvocationContext,
                parameters: &Value,
            ) -> Result<Value, StepError> {
                Ok(parameters.clone())
            }
        }

        let registry = ProviderRegistry::new().with_provider("tag", Arc::new(TaggingProvider));
        let (executor, results) = executor(EngineConfig::default(), registry);

        let workflow = Workflow::new("wf-dup", "acme", "Shared name")
            .with_step(WorkflowStep::new("report", "tag").with_parameters(json!("from-step")))
            .with_action(WorkflowStep::new("report", "tag").with_parameters(json!("from-action")));
        executor.execute(&manual_run(workflow)).await.unwrap();

        let saved = results.saved().await;
        assert_eq!(saved[0].result.results["report"], json!("from-step"));
    }
}
