//! Essay pipeline agent server.
//!
//! One binary serves every role; `AGENT_ROLE` picks which agent this
//! process is (`pipeline`, `essay-writer` or `style-editor`).

use essay_pipeline::{api, config::Config};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("essay_pipeline=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "Starting {} agent (model: {})",
        config.role.as_str(),
        config.model
    );

    api::serve(config).await
}
