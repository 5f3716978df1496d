use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forge_mirror::config::{ConfigError, MirrorConfig};
use forge_mirror::dispatch::{Dispatcher, DEFAULT_CAPACITY};
use forge_mirror::forge::{ForgeError, GitHubForge};
use forge_mirror::registry::Registry;
use forge_mirror::server::{build_router, AppState};
use forge_mirror::sync::SyncContext;

#[derive(Debug, Error)]
enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error("failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forge_mirror=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = match std::env::args().nth(1) {
        Some(path) => PathBuf::from(path),
        None => {
            eprintln!("usage: forge-mirror <config.toml>");
            std::process::exit(1);
        }
    };

    // Setup is interruptible: Ctrl-C before the listener is up exits 2.
    let (listener, app, state) = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted during startup");
            std::process::exit(2);
        }
        result = setup(&config_path) => match result {
            Ok(ready) => ready,
            Err(err) => {
                error!(error = %err, "startup failed");
                std::process::exit(1);
            }
        },
    };

    match listener.local_addr() {
        Ok(addr) => info!(
            %addr,
            projects = state.registry().len(),
            "listening for triggers"
        ),
        Err(err) => error!(error = %err, "listener has no local address"),
    }

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown requested");
    };

    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        error!(error = %err, "server error");
        std::process::exit(1);
    }

    // Stop scheduling; in-flight workers run to completion on the runtime.
    state.dispatcher().shutdown();
    info!("shutdown complete");
}

async fn setup(config_path: &Path) -> Result<(TcpListener, axum::Router, AppState), SetupError> {
    let config = MirrorConfig::load(config_path)?;
    let registry = Arc::new(Registry::from_config(&config));

    info!(
        projects = registry.len(),
        cache_dir = %config.service.cache_dir.display(),
        "configuration loaded"
    );

    let ctx = Arc::new(SyncContext {
        registry: registry.clone(),
        forge: GitHubForge::new(config.service.token.clone())?,
        cache_dir: config.service.cache_dir.clone(),
    });

    let dispatcher = Dispatcher::new(ctx, DEFAULT_CAPACITY);
    let state = AppState::new(registry, dispatcher);
    let app = build_router(state.clone());

    let listener = TcpListener::bind((
        config.service.listen_address.as_str(),
        config.service.listen_port,
    ))
    .await?;

    Ok((listener, app, state))
}
