//! HTTP server for questd

use crate::dispatch;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use quest_common::{ChannelSink, Notifier, ProgressionEngine, QuestConfig, TracingSink};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub engine: ProgressionEngine,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: ProgressionEngine) -> Self {
        Self {
            engine,
            start_time: Instant::now(),
        }
    }
}

/// All routes, with request tracing
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::event_routes())
        .merge(routes::user_routes())
        .merge(routes::catalog_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Build the engine from config, start the dispatch task and serve.
pub async fn run(config: QuestConfig) -> Result<()> {
    let rules = config.build_rules().context("Invalid progression rules")?;
    for event_type in rules.unknown_requirement_types() {
        warn!("  Badge requirement on unregistered event type '{}'", event_type);
    }
    for (badge, req) in rules.badges.placeholders() {
        info!(
            "  Badge '{}' uses placeholder event '{}'",
            badge.id, req.event_type
        );
    }
    info!(
        "  Rules: {} event types, {} levels, {} badges",
        rules.taxonomy.len(),
        rules.levels.levels().len(),
        rules.badges.len()
    );

    let ledger = config.open_ledger().context("Failed to open event ledger")?;

    let (notifier, dispatcher) = if config.notifications.enabled {
        let (sink, rx) = ChannelSink::channel(config.notifications.queue_capacity);
        let handle = tokio::spawn(dispatch::drain(rx, Arc::new(TracingSink)));
        (Notifier::new(Arc::new(sink)), Some(handle))
    } else {
        info!("  Notifications disabled");
        (Notifier::disabled(), None)
    };

    let engine = ProgressionEngine::new(ledger, Arc::new(rules), notifier);
    let app = build_router(Arc::new(AppState::new(engine)));

    let listener = tokio::net::TcpListener::bind(&config.server.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen))?;
    info!("  Listening on http://{}", config.server.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router (and with it the last sender) is gone; let the queue drain
    if let Some(handle) = dispatcher {
        if let Err(e) = handle.await {
            warn!("  Notification dispatcher ended abnormally: {}", e);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("  Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down gracefully");
}
