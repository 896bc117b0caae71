use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::SyncError;
use crate::sync::RunStats;

#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub run: u64,
    pub ok: bool,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RunStats>,
}

/// Outcome of the most recent run, shared between the scheduler and the server.
#[derive(Clone, Default)]
pub struct HealthState {
    last: Arc<RwLock<Option<LastRun>>>,
}

impl HealthState {
    pub async fn record(&self, run: u64, result: &Result<RunStats, SyncError>) {
        let last = match result {
            Ok(stats) => LastRun {
                run,
                ok: true,
                finished_at: Utc::now(),
                error: None,
                stats: Some(stats.clone()),
            },
            Err(e) => LastRun {
                run,
                ok: false,
                finished_at: Utc::now(),
                error: Some(e.to_string()),
                stats: None,
            },
        };
        *self.last.write().await = Some(last);
    }

    pub async fn last_run(&self) -> Option<LastRun> {
        self.last.read().await.clone()
    }
}

pub fn router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn readyz(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    match state.last_run().await {
        Some(last) if last.ok => (
            StatusCode::OK,
            Json(json!({ "status": "ready", "last_run": last })),
        ),
        Some(last) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "failing", "last_run": last })),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        ),
    }
}

pub async fn serve(bind: &str, state: HealthState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {bind}"))?;
    info!("health endpoint on http://{}", bind);
    axum::serve(listener, router(state))
        .await
        .context("Health endpoint stopped")?;
    Ok(())
}
