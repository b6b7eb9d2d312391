//! Anotador Back binary entrypoint wiring REST, SSE, the local snapshot and the match store.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use anotador_back::{
    config::AppConfig,
    dao::{local_snapshot::LocalSnapshot, match_store::memory::MemoryMatchStore},
    routes,
    services::{match_service, sse_events, sync_reconciler},
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let players = Arc::new(config.player_directory());
    let snapshot = match config.snapshot_path() {
        Some(path) => LocalSnapshot::new(path),
        None => LocalSnapshot::disabled(),
    };

    let app_state = AppState::new(config, players, snapshot);
    match_service::restore_local_snapshot(&app_state).await;

    sync_reconciler::spawn_writer(app_state.clone());
    sse_events::spawn_status_forwarder(app_state.clone());
    start_match_store(app_state.clone()).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervise CouchDB when it is configured, otherwise keep everything in memory.
#[cfg(feature = "couch-store")]
async fn start_match_store(state: SharedState) {
    use anotador_back::{
        dao::{
            match_store::{
                MatchStore,
                couchdb::{CouchConfig, CouchMatchStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    let Some(couch_config) = CouchConfig::from_env() else {
        info!("COUCH_BASE_URL not set; using the in-memory match store");
        install_memory_store(&state).await;
        return;
    };

    info!(base_url = %couch_config.base_url, database = %couch_config.database, "using CouchDB match store");
    tokio::spawn(storage_supervisor::run(state, move || {
        let couch_config = couch_config.clone();
        async move {
            let store = CouchMatchStore::connect(couch_config)
                .await
                .map_err(StorageError::from)?;
            Ok::<Arc<dyn MatchStore>, StorageError>(Arc::new(store))
        }
    }));
}

#[cfg(not(feature = "couch-store"))]
async fn start_match_store(state: SharedState) {
    install_memory_store(&state).await;
}

async fn install_memory_store(state: &SharedState) {
    state
        .set_match_store(Arc::new(MemoryMatchStore::new()))
        .await;
    info!("in-memory match store installed; history lasts until shutdown");
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
