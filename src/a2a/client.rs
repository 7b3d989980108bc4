//! JSON-RPC client for talking to another A2A agent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use thiserror::Error;

use super::types::{
    AgentCard, JsonRpcRequest, JsonRpcResponse, Message, MessageSendParams, Task,
};
use crate::pipeline::Skill;
use crate::task::TaskState;

/// Failure of a call to a remote agent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteAgentError {
    #[error("Remote agent returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Remote agent request failed: {0}")]
    Transport(String),

    #[error("Remote agent error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Unexpected response from remote agent: {0}")]
    Decode(String),

    #[error("Remote task ended in state {0}")]
    NotCompleted(TaskState),

    #[error("Remote task completed without a text result")]
    MissingText,
}

/// Client for one remote agent base URL.
pub struct A2aClient {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
}

impl A2aClient {
    /// `timeout` bounds every request, including a blocking `message/send`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteAgentError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteAgentError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the remote agent card.
    pub async fn agent_card(&self) -> Result<AgentCard, RemoteAgentError> {
        let url = format!("{}/.well-known/agent.json", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteAgentError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteAgentError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RemoteAgentError::Decode(e.to_string()))
    }

    pub async fn send_message(&self, params: &MessageSendParams) -> Result<Task, RemoteAgentError> {
        let params = serde_json::to_value(params).map_err(|e| RemoteAgentError::Decode(e.to_string()))?;
        self.call("message/send", params).await
    }

    /// Send a single text part, optionally targeting a skill.
    pub async fn send_text(
        &self,
        text: &str,
        skill: Option<Skill>,
    ) -> Result<Task, RemoteAgentError> {
        let params = MessageSendParams {
            message: Message::user_text(text),
            configuration: None,
            metadata: skill.map(|s| json!({ "skill_id": s.id() })),
        };
        self.send_message(&params).await
    }

    pub async fn get_task(&self, task_id: &str) -> Result<Task, RemoteAgentError> {
        self.call("tasks/get", json!({ "id": task_id })).await
    }

    pub async fn cancel_task(&self, task_id: &str) -> Result<Task, RemoteAgentError> {
        self.call("tasks/cancel", json!({ "id": task_id })).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RemoteAgentError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| RemoteAgentError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteAgentError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(RemoteAgentError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let rpc: JsonRpcResponse =
            serde_json::from_str(&body).map_err(|e| RemoteAgentError::Decode(e.to_string()))?;

        if let Some(error) = rpc.error {
            return Err(RemoteAgentError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| RemoteAgentError::Decode("response has neither result nor error".to_string()))?;
        serde_json::from_value(result).map_err(|e| RemoteAgentError::Decode(e.to_string()))
    }
}

/// Text of a completed task, or why there is none.
pub fn completed_text(task: &Task) -> Result<String, RemoteAgentError> {
    if task.status.state != TaskState::Completed {
        return Err(RemoteAgentError::NotCompleted(task.status.state));
    }
    task.status
        .text()
        .map(str::to_string)
        .ok_or(RemoteAgentError::MissingText)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::TaskStatus;

    #[test]
    fn test_completed_text() {
        let mut task = Task::submitted("t", "c");
        assert_eq!(
            completed_text(&task),
            Err(RemoteAgentError::NotCompleted(TaskState::Submitted))
        );

        task.status = TaskStatus::new(TaskState::Completed, None);
        assert_eq!(completed_text(&task), Err(RemoteAgentError::MissingText));

        task.status = TaskStatus::new(
            TaskState::Completed,
            Some(Message::agent_text("Text edited:\n\nBetter", "c", "t")),
        );
        assert_eq!(completed_text(&task).unwrap(), "Text edited:\n\nBetter");
    }

    #[test]
    fn test_base_url_is_normalised() {
        let client = A2aClient::new("http://style-editor:8002/", Duration::from_secs(1)).unwrap();
        assert_eq!(client.base_url(), "http://style-editor:8002");
    }
}
