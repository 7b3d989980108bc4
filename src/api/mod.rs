//! HTTP API for an agent.
//!
//! ## Endpoints
//!
//! - `GET /.well-known/agent.json` - Agent card (also at `agent-card.json`)
//! - `GET /health` - Health check
//! - `POST /` - JSON-RPC: `message/send`, `message/stream`, `tasks/get`, `tasks/cancel`

mod jsonrpc;
pub mod routes;

pub use routes::{router, serve, AppState};
