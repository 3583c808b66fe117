use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::Mutex;
use crate::config::Config;
use crate::models::{MarketSnapshot, OptimizationResult, Recommendation};
use crate::services::{LocalStorage, Optimizer, SnapshotCache, SnapshotCollector};
use crate::sources::FetchError;

pub struct AppState {
    pub collector: Arc<SnapshotCollector>,
    pub cache: Arc<SnapshotCache>,
    pub optimizer: Optimizer,
    pub storage: Option<LocalStorage>,
    pub config: Config,
    /// Held while a cold cache is refilled so only one request hits upstream.
    refill: Mutex<()>,
}

impl AppState {
    pub fn new(
        collector: Arc<SnapshotCollector>,
        cache: Arc<SnapshotCache>,
        storage: Option<LocalStorage>,
        config: Config,
    ) -> Self {
        Self {
            collector,
            cache,
            optimizer: Optimizer::new(config.optimizer.clone()),
            storage,
            config,
            refill: Mutex::new(()),
        }
    }
}

pub struct ApiError(FetchError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.0.to_string(),
        }));
        (StatusCode::BAD_GATEWAY, body).into_response()
    }
}

impl From<FetchError> for ApiError {
    fn from(e: FetchError) -> Self {
        ApiError(e)
    }
}

async fn current_snapshot(state: &AppState) -> Result<Arc<MarketSnapshot>, FetchError> {
    if let Some(snapshot) = state.cache.get() {
        return Ok(snapshot);
    }

    let _refill = state.refill.lock().await;
    // another request may have refilled while we waited
    if let Some(snapshot) = state.cache.get() {
        return Ok(snapshot);
    }
    let snapshot = state.collector.collect().await?;
    if let Some(storage) = &state.storage {
        if let Err(e) = storage.save_snapshot(&snapshot) {
            tracing::warn!("Could not save snapshot: {}", e);
        }
    }
    Ok(state.cache.insert(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

async fn build_report(state: &AppState) -> Result<OptimizationResult, FetchError> {
    let snapshot = current_snapshot(state).await?;
    let fiat = if state.config.fiat_balances.is_empty() {
        None
    } else {
        Some(state.config.fiat_balances.as_slice())
    };
    Ok(state.optimizer.analyze_and_optimize(
        &state.config.balances,
        &snapshot,
        &state.config.user,
        fiat,
    ))
}

/// GET /report - recommendations for the configured user
async fn get_report(State(state): State<Arc<AppState>>) -> Result<Json<OptimizationResult>, ApiError> {
    let report = build_report(&state).await?;
    Ok(Json(report))
}

/// GET /recommendations?type=bridge
async fn get_recommendations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = build_report(&state).await?;
    let recommendations: Vec<Recommendation> = match &query.kind {
        Some(kind) => report.recommendations_of(kind).into_iter().cloned().collect(),
        None => report.recommendations.clone(),
    };
    Ok(Json(serde_json::json!({
        "count": recommendations.len(),
        "total_potential_savings": report.total_potential_savings,
        "recommendations": recommendations,
    })))
}

/// POST /refresh - drop the cached snapshot and collect a new one
async fn refresh(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>, ApiError> {
    state.cache.clear();
    let snapshot = current_snapshot(&state).await?;
    Ok(Json(serde_json::json!({
        "as_of": snapshot.as_of,
        "chains": snapshot.historical.keys().collect::<Vec<_>>(),
    })))
}

/// GET /snapshot - the market data reports are built from
async fn get_snapshot(State(state): State<Arc<AppState>>) -> Result<Json<MarketSnapshot>, ApiError> {
    let snapshot = current_snapshot(&state).await?;
    Ok(Json((*snapshot).clone()))
}

/// GET /health
async fn health() -> &'static str {
    "OK"
}

/// GET /stats
async fn stats(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let stats = state.collector.get_stats();
    Json(serde_json::json!({
        "chains": state.collector.chains(),
        "balances": state.config.balances.len(),
        "cache_age_secs": state.cache.age().map(|a| a.as_secs()),
        "snapshots": stats.snapshots.load(Ordering::Relaxed),
        "total_requests": stats.total_requests.load(Ordering::Relaxed),
        "successful": stats.successful.load(Ordering::Relaxed),
        "failed": stats.failed.load(Ordering::Relaxed),
        "reports_saved": state.storage.as_ref().map(|s| s.report_count()),
    }))
}

pub fn create_rest_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/report", get(get_report))
        .route("/recommendations", get(get_recommendations))
        .route("/refresh", post(refresh))
        .route("/snapshot", get(get_snapshot))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .with_state(state)
}
