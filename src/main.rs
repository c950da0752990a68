//! `AgriConnect` USSD - menu session service
//!
//! Serves the USSD gateway webhook: reconstructs each caller's menu session
//! from the gateway session id, computes the next screen, and runs
//! registrations and notifications in the background.

mod api;
mod config;
mod db;
mod gateway;
mod menu;
mod runtime;
mod session;
mod sms;
mod state_machine;

use api::{create_router, AppState};
use config::{AppConfig, SessionBackendKind};
use db::Database;
use runtime::{DatabaseRegistrar, Dispatcher, Notifier, UssdRuntime};
use session::{DatabaseBackend, MemoryBackend, SessionBackend, SessionStore};
use sms::{AfricasTalkingNotifier, LogNotifier};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agriconnect_ussd=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AppConfig::from_env();

    // Ensure database directory exists
    if let Some(parent) = PathBuf::from(&config.db_path).parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Initialize database
    tracing::info!(path = %config.db_path, "Opening database");
    let db = Database::open(&config.db_path)?;

    let registry = Arc::new(menu::agriconnect()?);

    // Session store
    let backend: Arc<dyn SessionBackend> = match config.session_backend {
        SessionBackendKind::Memory => Arc::new(MemoryBackend::new()),
        SessionBackendKind::Sqlite => {
            Arc::new(DatabaseBackend::new(db.clone(), registry.root_id()))
        }
    };
    let sessions = Arc::new(SessionStore::new(
        backend,
        config.session_ttl,
        registry.root_id(),
    ));
    tracing::info!(
        backend = ?config.session_backend,
        ttl_secs = config.session_ttl.as_secs(),
        "Session store initialized"
    );

    let shutdown = CancellationToken::new();
    let sweeper = sessions.spawn_sweeper(config.sweep_interval, shutdown.clone());

    // Collaborators
    let notifier: Arc<dyn Notifier> = match config.sms.clone() {
        Some(sms) => {
            tracing::info!(username = %sms.username, "SMS delivery via Africa's Talking");
            Arc::new(AfricasTalkingNotifier::new(sms)?)
        }
        None => {
            tracing::warn!(
                "No SMS credentials configured. Set AFRICASTALKING_USERNAME and AFRICASTALKING_API_KEY."
            );
            Arc::new(LogNotifier)
        }
    };
    let records = Arc::new(DatabaseRegistrar::new(db));
    let dispatcher = Dispatcher::new(records.clone(), records, notifier);

    // Create application state
    let runtime = Arc::new(UssdRuntime::new(registry, sessions, dispatcher));
    let state = AppState::new(runtime);

    if config.admin_enabled {
        tracing::warn!("Session administration routes enabled");
    }

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(state, config.admin_enabled)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CompressionLayer::new());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("AgriConnect USSD server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    sweeper.await?;

    Ok(())
}
