//! HTTP route handlers.

use std::sync::Arc;

use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::a2a::types::AgentCard;
use crate::a2a::{agent_card, A2aClient};
use crate::agents::{
    DisabledStyleEditor, EssayProducer, LocalStyleEditor, RemoteStyleEditor, StyleEditor,
};
use crate::config::{AgentRole, Config};
use crate::llm::{LlmClient, OpenAiClient, TextGenerator};
use crate::pipeline::PipelineOrchestrator;
use crate::task::TaskStore;

use super::jsonrpc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Card served at the well-known paths
    pub card: AgentCard,
    /// Runs every accepted task
    pub orchestrator: Arc<PipelineOrchestrator>,
    /// Tasks accepted by this agent
    pub tasks: Arc<TaskStore>,
}

impl AppState {
    /// Wire the agent for the configured role on top of `llm`.
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> anyhow::Result<Self> {
        let generator = TextGenerator::new(llm, config.model.clone());
        let essay = EssayProducer::new(generator.clone(), config.essay);

        let style: Arc<dyn StyleEditor> = match config.role {
            AgentRole::Pipeline | AgentRole::StyleEditor => {
                Arc::new(LocalStyleEditor::new(generator, config.edit))
            }
            AgentRole::EssayWriter => match &config.style_editor_url {
                Some(url) => {
                    tracing::info!("Delegating style edits to {}", url);
                    let client = A2aClient::new(url, config.remote_timeout)?;
                    Arc::new(RemoteStyleEditor::new(client))
                }
                None => {
                    tracing::warn!("STYLE_EDITOR_URL not set, essays will not be style-edited");
                    Arc::new(DisabledStyleEditor)
                }
            },
        };

        let orchestrator = PipelineOrchestrator::with_skills(
            essay,
            style,
            config.role.skills(),
            config.role.default_skill(),
        );

        Ok(Self {
            card: agent_card(&config),
            orchestrator: Arc::new(orchestrator),
            tasks: Arc::new(TaskStore::new(config.task_retention)),
            config,
        })
    }
}

/// Build the router for an agent.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", axum::routing::post(jsonrpc::handle_rpc))
        .route("/.well-known/agent.json", get(get_agent_card))
        .route("/.well-known/agent-card.json", get(get_agent_card))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::with_base_url(
        config.api_key.clone(),
        &config.api_base_url,
        config.llm_timeout,
    )?);

    let state = Arc::new(AppState::new(config.clone(), llm)?);
    let app = router(Arc::clone(&state));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        "{} ({}) listening on {}",
        state.card.name,
        config.role.as_str(),
        addr
    );

    let shutdown_state = Arc::clone(&state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown_state).await;
        })
        .await?;

    Ok(())
}

/// Wait for shutdown signal and fail tasks that are still running.
async fn shutdown_signal(state: Arc<AppState>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, failing unfinished tasks...");

    let interrupted = state
        .tasks
        .interrupt_unfinished("Error: agent shut down before the task finished")
        .await;
    if interrupted.is_empty() {
        tracing::info!("No running tasks to interrupt");
    } else {
        tracing::info!("Marked {} tasks as failed: {:?}", interrupted.len(), interrupted);
    }

    tracing::info!("Graceful shutdown complete");
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub role: String,
    pub tasks: usize,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        role: state.config.role.as_str().to_string(),
        tasks: state.tasks.len().await,
    })
}

async fn get_agent_card(State(state): State<Arc<AppState>>) -> Json<AgentCard> {
    Json(state.card.clone())
}
