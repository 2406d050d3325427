use std::net::SocketAddr;

use anyhow::Context;
use sigescon::{app, db, docs};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_PORT: u16 = 8000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env();
    init_tracing();

    let addr = SocketAddr::from(([0, 0, 0, 0], app_port()?));

    let pool = db::init().await?;
    let router = app::create_app(pool).await?.merge(docs::swagger_routes());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "sigescon listening, swagger ui at /docs");

    axum::serve(listener, router.into_make_service()).await?;
    Ok(())
}

/// `.env` in the working directory wins over the one next to the manifest.
fn load_env() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env"));
    }
}

fn app_port() -> anyhow::Result<u16> {
    match std::env::var("APP_PORT") {
        Ok(raw) => raw.parse().with_context(|| format!("APP_PORT must be a port number, got {raw:?}")),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,sqlx=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
