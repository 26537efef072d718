use anyhow::{Context, Result};
use lease_pipeline::{api, app::AppState, config, logging};
use std::net::Ipv4Addr;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_tracing();
    config::init_config().context("failed to load configuration")?;
    let config = config::get_config();
    let state = AppState::from_config(config).context("failed to initialize Google clients")?;
    let app = api::create_router(state);

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.server_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.server_port))?;
    tracing::info!("Listening on http://0.0.0.0:{}", config.server_port);
    axum::serve(listener, app)
        .await
        .context("HTTP server terminated unexpectedly")?;

    Ok(())
}
