//! Scheduler-facing HTTP surface.
//!
//! One trigger endpoint per job plus a health probe. The endpoints take no
//! body and always answer with a structured summary; no error escapes the
//! handlers unformatted.

use crate::adapters::{MetricsProvider, PostgresStore};
use crate::config::AppConfig;
use crate::engine::{DailyScoringJob, RolloverJob};
use crate::error::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

/// Run bookkeeping surfaced by the health probe
#[derive(Debug, Default)]
pub struct RunStats {
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_run_ok: Option<bool>,
    pub consecutive_errors: u32,
}

/// Shared state for the trigger server
pub struct AppState {
    pub store: PostgresStore,
    pub provider: Arc<dyn MetricsProvider>,
    pub config: AppConfig,
    pub stats: RwLock<RunStats>,
}

impl AppState {
    pub fn new(store: PostgresStore, provider: Arc<dyn MetricsProvider>, config: AppConfig) -> Self {
        Self {
            store,
            provider,
            config,
            stats: RwLock::new(RunStats::default()),
        }
    }

    async fn record_run(&self, ok: bool) {
        let mut stats = self.stats.write().await;
        stats.last_run_at = Some(Utc::now());
        stats.last_run_ok = Some(ok);
        if ok {
            stats.consecutive_errors = 0;
        } else {
            stats.consecutive_errors += 1;
        }
    }
}

/// Build the router for the trigger endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/jobs/daily-scoring", post(daily_scoring_handler))
        .route("/jobs/weekly-rollover", post(weekly_rollover_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Serve the trigger endpoints until the process is stopped
pub async fn serve(state: Arc<AppState>, port: u16) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Trigger server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::CrescendoError::Internal(format!("trigger server error: {}", e)))?;

    Ok(())
}

async fn daily_scoring_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let job = DailyScoringJob::new(
        state.store.clone(),
        Arc::clone(&state.provider),
        state.config.clone(),
    );

    match job.run().await {
        Ok(summary) => {
            state.record_run(true).await;
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!(
                        "scored {} artists, updated {} managers, resolved {} wagers",
                        summary.artists_scored, summary.managers_updated, summary.wagers_resolved
                    ),
                    "summary": summary,
                })),
            )
        }
        Err(e) => {
            error!("Daily scoring run failed: {}", e);
            state.record_run(false).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn weekly_rollover_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let job = RolloverJob::new(state.store.clone());

    match job.run().await {
        Ok(summary) => {
            state.record_run(true).await;
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": format!(
                        "season {} closed, {} managers ranked",
                        summary.season_id, summary.managers_ranked
                    ),
                    "summary": summary,
                })),
            )
        }
        Err(e) => {
            error!("Rollover run failed: {}", e);
            state.record_run(false).await;
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.stats.read().await;

    let status_code = if stats.consecutive_errors > 3 {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        status_code,
        Json(json!({
            "service": "crescendo",
            "last_run_at": stats.last_run_at.map(|t| t.to_rfc3339()),
            "last_run_ok": stats.last_run_ok,
            "consecutive_errors": stats.consecutive_errors,
        })),
    )
}
