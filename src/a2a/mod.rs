//! Agent-to-agent (A2A) protocol surface: wire types, the agent card this
//! process publishes, and a client for calling other agents.

pub mod card;
pub mod client;
pub mod types;

pub use card::agent_card;
pub use client::{A2aClient, RemoteAgentError};
