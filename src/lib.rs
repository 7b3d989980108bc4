//! # Essay Pipeline
//!
//! A2A agents that turn a topic into an essay and polish its style.
//!
//! ## Task Flow
//! 1. Receive a `message/send` or `message/stream` request
//! 2. Write an essay on the topic with the LLM
//! 3. Edit it for style, in-process or through a remote style-editor agent
//! 4. Report the result as the task's terminal status
//!
//! ## Modules
//! - `a2a`: Wire types, agent card and an A2A client
//! - `agents`: Essay producer and style editors
//! - `pipeline`: Orchestrator driving a task to its terminal state
//! - `task`: Task states and the in-memory task store
//! - `llm`: Chat-completion client
//! - `api`: HTTP and JSON-RPC surface

pub mod a2a;
pub mod agents;
pub mod api;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod task;

pub use config::{AgentRole, Config};
pub use pipeline::{PipelineOrchestrator, PipelineOutcome, PipelineTask, Skill};
pub use task::{TaskState, TaskStore};
