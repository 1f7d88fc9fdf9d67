//! API routes for questd
//!
//! Engine calls touch the ledger (blocking I/O) and always run on the
//! blocking pool.

use crate::server::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use quest_common::{
    BadgeCategory, BadgeDefinition, BadgeView, EventCounts, LedgerError, NotificationIntent,
    ProgressionEngine, RecordError, StreakStats, UserProgression,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

type AppStateArc = Arc<AppState>;
type ApiError = (StatusCode, String);

/// Default number of badges returned by the "closest" query
const DEFAULT_CLOSEST_LIMIT: usize = 3;

async fn read_blocking<T, F>(state: &AppStateArc, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ProgressionEngine) -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| {
            error!("  Ledger task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(|e| {
            error!("  Ledger read failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        })
}

fn record_error_status(e: &RecordError) -> StatusCode {
    match e {
        RecordError::EmptyUser | RecordError::InvalidEventType(_) => StatusCode::BAD_REQUEST,
        RecordError::Ledger(_) => StatusCode::SERVICE_UNAVAILABLE,
        RecordError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// ============================================================================
// Event Routes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    pub user_id: String,
    pub event_type: String,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventResponse {
    pub event_id: Uuid,
    pub recorded: bool,
    /// Streak milestone event types recorded alongside
    pub milestones: Vec<String>,
    pub notifications: Vec<NotificationIntent>,
}

pub fn event_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/events", post(record_event))
}

async fn record_event(
    State(state): State<AppStateArc>,
    payload: Result<Json<RecordEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RecordEventResponse>), ApiError> {
    let Json(req) = payload.map_err(|e| {
        warn!("  Rejected event body: {}", e.body_text());
        (StatusCode::BAD_REQUEST, e.body_text())
    })?;
    debug!("  Recording {} for {}", req.event_type, req.user_id);

    let engine = state.engine.clone();
    let receipt = tokio::task::spawn_blocking(move || {
        let occurred_at = req.occurred_at.unwrap_or_else(Utc::now);
        engine.record_event_at(&req.user_id, &req.event_type, occurred_at)
    })
    .await
    .map_err(|e| RecordError::Join(e.to_string()))
    .and_then(|r| r)
    .map_err(|e| {
        if e.is_invalid_input() {
            warn!("  Rejected event: {}", e);
        } else {
            error!("  Failed to record event: {}", e);
        }
        (record_error_status(&e), e.to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RecordEventResponse {
            event_id: receipt.event.id,
            recorded: true,
            milestones: receipt.milestones.into_iter().map(|m| m.event_type).collect(),
            notifications: receipt.intents,
        }),
    ))
}

// ============================================================================
// User Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ClosestQuery {
    pub limit: Option<usize>,
}

pub fn user_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/users/:id/progression", get(user_progression))
        .route("/v1/users/:id/badges", get(user_badges))
        .route("/v1/users/:id/badges/closest", get(closest_badges))
        .route("/v1/users/:id/counts", get(user_counts))
        .route("/v1/users/:id/streak", get(user_streak))
}

async fn user_progression(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProgression>, ApiError> {
    read_blocking(&state, move |engine| engine.user_progression(&user_id))
        .await
        .map(Json)
}

async fn user_badges(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<BadgeView>>, ApiError> {
    read_blocking(&state, move |engine| engine.badge_views(&user_id))
        .await
        .map(Json)
}

async fn closest_badges(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
    Query(query): Query<ClosestQuery>,
) -> Result<Json<Vec<BadgeView>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_CLOSEST_LIMIT);
    read_blocking(&state, move |engine| engine.closest_badges(&user_id, limit))
        .await
        .map(Json)
}

async fn user_counts(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<EventCounts>, ApiError> {
    read_blocking(&state, move |engine| engine.event_counts(&user_id))
        .await
        .map(Json)
}

async fn user_streak(
    State(state): State<AppStateArc>,
    Path(user_id): Path<String>,
) -> Result<Json<StreakStats>, ApiError> {
    read_blocking(&state, move |engine| engine.streak(&user_id))
        .await
        .map(Json)
}

// ============================================================================
// Catalog Routes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

pub fn catalog_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/v1/badges", get(list_badges))
        .route("/v1/badges/:id", get(get_badge))
}

async fn list_badges(
    State(state): State<AppStateArc>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<Vec<BadgeDefinition>>, ApiError> {
    let badges = match query.category {
        None => state.engine.all_badges().to_vec(),
        Some(raw) => {
            let category = BadgeCategory::parse(&raw).ok_or_else(|| {
                (
                    StatusCode::BAD_REQUEST,
                    format!("Unknown badge category '{}'", raw),
                )
            })?;
            state
                .engine
                .badges_by_category(category)
                .into_iter()
                .cloned()
                .collect()
        }
    };
    Ok(Json(badges))
}

async fn get_badge(
    State(state): State<AppStateArc>,
    Path(id): Path<String>,
) -> Result<Json<BadgeDefinition>, ApiError> {
    state
        .engine
        .badge(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Badge '{}' not found", id)))
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub ledger: String,
    pub badges: usize,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/health", get(health))
}

async fn health(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: quest_common::VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        ledger: state.engine.ledger().backend().to_string(),
        badges: state.engine.all_badges().len(),
    })
}
