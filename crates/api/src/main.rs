use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use autofilm_infra::{AppConfig, ExecutionCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match dotenvy::dotenv() {
        Ok(_) | Err(dotenvy::Error::Io(_)) => {}
        Err(e) => return Err(e).context("failed to read .env"),
    }

    let path = AppConfig::resolve_path(std::env::args_os().nth(1).map(PathBuf::from));
    let config = AppConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))?;

    autofilm_observability::init_with(&config.log.level, config.log.json);

    let registry = Arc::new(config.build_registry()?);
    let scheduler = config.scheduler(&registry)?;
    let coordinator = ExecutionCoordinator::new(
        registry.clone(),
        Arc::new(config.history_log()),
        Arc::new(config.executor_factory()?),
    );

    tracing::info!(
        path = %path.display(),
        tasks = registry.len(),
        scheduled = scheduler.jobs().len(),
        "configuration loaded"
    );

    let scheduler = scheduler.spawn(coordinator.clone(), CancellationToken::new());

    if config.api.enabled {
        let app = autofilm_api::build_app(coordinator, config.api.api_key.clone());
        let addr = config.api.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;

        tracing::info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    } else {
        tracing::info!("api disabled; running scheduler only");
        shutdown_signal().await;
    }

    scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
