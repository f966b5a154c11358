// Workflow Engine - Trigger evaluation, scheduling, and execution

pub mod definition;
pub mod executor;
pub mod filters;
pub mod manager;
pub mod matcher;
pub mod queue;
pub mod scheduler;
pub mod triggers;

pub use definition::{Workflow, WorkflowDefinition, WorkflowStep};
pub use executor::{ExecutionResult, RunState, WorkflowExecutor};
pub use manager::WorkflowManager;
pub use matcher::TriggerMatcher;
pub use queue::{QueueFull, RunQueue, ScheduledRun};
pub use scheduler::Dispatcher;
pub use triggers::{EventPayload, FilterSpec, TriggerKind, TriggerSpec};
