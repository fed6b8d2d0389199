use anyhow::{Context, Result};
use axum::Router;
use std::io::ErrorKind;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use gallery_api::{config, routes, services};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting gallery-api with config: {:?}", cfg);

    // --- Initialize core service ---
    let service = services::gallery_service::GalleryService::from_config(&cfg)
        .context("building gallery service")?;

    // Optionally build the listing cache before accepting traffic. Failure
    // is not fatal: the cache also populates lazily on the first request.
    if cfg.warm_cache {
        match service.cache.initialize().await {
            Ok(snapshot) => {
                tracing::info!(groups = snapshot.data.len(), "listing cache warmed")
            }
            Err(err) => tracing::warn!("failed to warm listing cache: {}", err),
        }
    }

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service.clone());

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.cache.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }
}
