//! Task module - task lifecycle states, status updates and the task store.
//!
//! State transitions:
//! - Submitted -> Working -> Completed | Failed | Canceled
//! - Submitted -> Canceled (cancel before any work started)
//!
//! A task reaches exactly one terminal state. Once terminal, further updates
//! are ignored (first terminal state wins).

pub mod store;

pub use store::{ApplyResult, StoreError, TaskStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Task state as carried on the A2A wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Accepted by the transport, no work started yet.
    Submitted,
    /// An agent is producing output.
    Working,
    Completed,
    Failed,
    Canceled,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Submitted => "submitted",
            TaskState::Working => "working",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status event emitted for a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusUpdate {
    pub task_id: String,
    pub context_id: String,
    pub state: TaskState,
    /// Agent text attached to the status (final text or error description).
    pub message: Option<String>,
}

impl TaskStatusUpdate {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        state: TaskState,
        message: Option<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            state,
            message,
        }
    }

    /// Whether this update closes the task's lifecycle.
    pub fn is_final(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Port through which task status leaves the orchestrator.
///
/// Implementations decide how updates reach the caller (a task store, a
/// stream, a test recorder). Delivery failures are the sink's concern.
#[async_trait]
pub trait TaskEventSink: Send + Sync {
    async fn emit(&self, update: TaskStatusUpdate);
}
