//! Vigil workflow engine: trigger evaluation and execution scheduling for
//! an alerting/incident platform.
//!
//! Producers hand domain events (alert changes, incident transitions, user
//! mentions) to a [`WorkflowManager`]; each tenant's workflow triggers are
//! evaluated against the event, matched runs are queued, and a background
//! dispatcher executes them on a bounded worker pool, persisting every run's
//! aggregated results.

pub mod config;
pub mod error;
pub mod mentions;
pub mod notify;
pub mod providers;
pub mod store;
pub mod workflows;

pub use config::EngineConfig;
pub use error::{ExecutionError, StepError};
pub use notify::{NoopNotifier, RealtimeNotifier};
pub use workflows::{
    Dispatcher, EventPayload, ExecutionResult, FilterSpec, RunQueue, RunState, ScheduledRun,
    TriggerKind, TriggerMatcher, TriggerSpec, Workflow, WorkflowDefinition, WorkflowExecutor,
    WorkflowManager, WorkflowStep,
};
