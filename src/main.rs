use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rooms_api::{config, database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rooms_api=debug,tower_http=info")),
        )
        .init();

    let config = config::config();
    tracing::info!("Starting rooms API in {:?} mode", config.environment);

    let pool = database::connect().context("configuring database pool")?;
    let state = AppState::new(pool).context("building posts querier")?;
    let app = rooms_api::app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("ROOMS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("rooms API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}
