//! In-memory A2A task store.
//!
//! Holds the current snapshot of every task this agent has accepted and
//! fans status events out to streaming subscribers. Terminal tasks are
//! evicted once they are older than the configured retention.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use super::{TaskEventSink, TaskState, TaskStatusUpdate};
use crate::a2a::types::{Message, Task, TaskStatus, TaskStatusUpdateEvent};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Task {0} already exists")]
    AlreadyExists(String),
}

/// Result of applying a status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// The task was already terminal; the update was dropped.
    Ignored { current: TaskState },
    UnknownTask,
}

struct TaskRecord {
    task: Task,
    events: broadcast::Sender<TaskStatusUpdateEvent>,
    finished_at: Option<Instant>,
}

/// Shared store of tasks keyed by task id.
pub struct TaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
    retention: Duration,
}

impl TaskStore {
    pub fn new(retention: Duration) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Register a new task in `submitted` state.
    ///
    /// Missing ids are generated. A caller-supplied task id must not exist yet.
    pub async fn create(
        &self,
        task_id: Option<String>,
        context_id: Option<String>,
    ) -> Result<Task, StoreError> {
        self.create_subscribed(task_id, context_id)
            .await
            .map(|(task, _)| task)
    }

    /// Like [`TaskStore::create`], also returning a receiver that sees every
    /// status event of the new task.
    pub async fn create_subscribed(
        &self,
        task_id: Option<String>,
        context_id: Option<String>,
    ) -> Result<(Task, broadcast::Receiver<TaskStatusUpdateEvent>), StoreError> {
        let task_id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let context_id = context_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut tasks = self.tasks.write().await;
        self.evict_expired(&mut tasks);

        if tasks.contains_key(&task_id) {
            return Err(StoreError::AlreadyExists(task_id));
        }

        let task = Task::submitted(task_id.clone(), context_id);
        let (events, receiver) = broadcast::channel(EVENT_CAPACITY);
        tasks.insert(
            task_id,
            TaskRecord {
                task: task.clone(),
                events,
                finished_at: None,
            },
        );
        Ok((task, receiver))
    }

    pub async fn get(&self, task_id: &str) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).map(|r| r.task.clone())
    }

    /// Subscribe to status events of a task.
    pub async fn subscribe(
        &self,
        task_id: &str,
    ) -> Option<broadcast::Receiver<TaskStatusUpdateEvent>> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).map(|r| r.events.subscribe())
    }

    /// Apply a status update. The first terminal state wins.
    pub async fn apply(&self, update: &TaskStatusUpdate) -> ApplyResult {
        let mut tasks = self.tasks.write().await;
        let Some(record) = tasks.get_mut(&update.task_id) else {
            return ApplyResult::UnknownTask;
        };

        let current = record.task.status.state;
        if current.is_terminal() {
            return ApplyResult::Ignored { current };
        }

        let message = update
            .message
            .as_ref()
            .map(|text| Message::agent_text(text.clone(), &record.task.context_id, &record.task.id));
        record.task.status = TaskStatus::new(update.state, message);
        if update.is_final() {
            record.finished_at = Some(Instant::now());
        }

        // No subscribers is fine.
        let _ = record
            .events
            .send(TaskStatusUpdateEvent::from_task(&record.task));
        ApplyResult::Applied
    }

    /// Record that no work will run for a task that was dropped for lack of
    /// input. Its status is left untouched and no event is sent; the record
    /// only becomes subject to retention.
    pub async fn mark_dropped(&self, task_id: &str) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(record) if record.finished_at.is_none() => {
                record.finished_at = Some(Instant::now());
                true
            }
            _ => false,
        }
    }

    /// Fail every task whose work is still in flight.
    ///
    /// Dropped tasks are left alone. Returns the ids of the tasks that were
    /// failed.
    pub async fn interrupt_unfinished(&self, message: &str) -> Vec<String> {
        let unfinished: Vec<(String, String)> = {
            let tasks = self.tasks.read().await;
            tasks
                .values()
                .filter(|r| r.finished_at.is_none() && !r.task.status.state.is_terminal())
                .map(|r| (r.task.id.clone(), r.task.context_id.clone()))
                .collect()
        };

        let mut interrupted = Vec::new();
        for (task_id, context_id) in unfinished {
            let update = TaskStatusUpdate::new(
                task_id.clone(),
                context_id,
                TaskState::Failed,
                Some(message.to_string()),
            );
            if self.apply(&update).await == ApplyResult::Applied {
                interrupted.push(task_id);
            }
        }
        interrupted
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    fn evict_expired(&self, tasks: &mut HashMap<String, TaskRecord>) {
        let before = tasks.len();
        tasks.retain(|_, r| match r.finished_at {
            Some(at) => at.elapsed() < self.retention,
            None => true,
        });
        let evicted = before - tasks.len();
        if evicted > 0 {
            tracing::debug!("Evicted {} finished tasks", evicted);
        }
    }
}

#[async_trait]
impl TaskEventSink for TaskStore {
    async fn emit(&self, update: TaskStatusUpdate) {
        match self.apply(&update).await {
            ApplyResult::Applied => {
                tracing::debug!("Task {} -> {}", update.task_id, update.state);
            }
            ApplyResult::Ignored { current } => {
                tracing::debug!(
                    "Dropped {} update for task {} (already {})",
                    update.state,
                    update.task_id,
                    current
                );
            }
            ApplyResult::UnknownTask => {
                tracing::warn!("Status update for unknown task {}", update.task_id);
            }
        }
    }
}
