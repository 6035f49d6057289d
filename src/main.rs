use std::sync::Arc;

use tracing::info;

use pharma_meta_api::config::{init_tracing, load_config};
use pharma_meta_api::{db, schema, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.log_level, config.log_json);

    let pool = db::establish_connection_from_app_config(&config).await?;
    if config.bootstrap_schema {
        schema::bootstrap_schema(&pool).await?;
    }

    let state = AppState::new(Arc::new(pool), config.clone());
    state.audit.clear_stale();

    let app = pharma_meta_api::app(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install shutdown handler");
        return;
    }
    info!("shutdown signal received");
}
