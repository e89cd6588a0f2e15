use anyhow::Context;
use tracing::info;

use crate::app::{app, AppState};
use crate::config::AppConfig;
use crate::database::{manager, schema, Session};

/// Connects, makes sure the schema exists and serves until the process is stopped.
pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    info!("Starting Userbase API in {:?} mode", config.environment);

    let pool = manager::connect(&config.database).await?;
    schema::ensure_schema(&pool).await?;

    let bind_addr = config.bind_addr();
    let prefix = config.api.prefix.clone();
    let state = AppState::with_jwks(config, Session::postgres(pool));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Userbase API listening on http://{}{}", bind_addr, prefix);

    axum::serve(listener, app(state)).await.context("server error")?;
    Ok(())
}
