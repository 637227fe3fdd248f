use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use chrono::{Duration, Utc};
use log::warn;
use serde::Deserialize;

use crate::api::ws::ws_handler;
use crate::engine::Engine;
use crate::ledger::{LedgerView, PerformanceSnapshot};
use crate::persistence::{self, PgPool};
use crate::types::decision::Decision;
use crate::types::quote::PriceQuote;
use crate::types::trade::Trade;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;
const DEFAULT_HISTORY_HOURS: i64 = 72;
const MAX_HISTORY_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    /// Storage is optional; reads fall back to in-memory state when absent or failing.
    pub db: Option<PgPool>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn clamped(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenTradesQuery {
    pub agent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub hours: Option<i64>,
}

async fn health() -> &'static str {
    "healthy"
}

async fn prices(State(state): State<AppState>) -> Json<Vec<PriceQuote>> {
    Json(state.engine.feed().all().await)
}

async fn models(State(state): State<AppState>) -> Json<Vec<LedgerView>> {
    Json(state.engine.states().await)
}

async fn recent_trades(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Trade>> {
    let limit = query.clamped();
    if let Some(db) = &state.db {
        match persistence::list_recent_trades(db, limit).await {
            Ok(trades) => return Json(trades),
            Err(e) => warn!("recent trades read failed, serving journal: {}", e),
        }
    }
    let journal = state.engine.publisher().journal().read().await;
    Json(journal.recent_trades(limit))
}

async fn open_trades(
    State(state): State<AppState>,
    Query(query): Query<OpenTradesQuery>,
) -> Json<Vec<Trade>> {
    // Ledgers are authoritative; stored OPEN rows may predate this process.
    Json(state.engine.open_trades(query.agent.as_deref()).await)
}

async fn recent_decisions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Json<Vec<Decision>> {
    let limit = query.clamped();
    if let Some(db) = &state.db {
        match persistence::list_recent_decisions(db, limit).await {
            Ok(decisions) => return Json(decisions),
            Err(e) => warn!("recent decisions read failed, serving journal: {}", e),
        }
    }
    let journal = state.engine.publisher().journal().read().await;
    Json(journal.recent_decisions(limit))
}

async fn model_history(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<PerformanceSnapshot>>, StatusCode> {
    if state.engine.ledger(&agent_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let Some(db) = &state.db else {
        return Ok(Json(Vec::new()));
    };
    let hours = query
        .hours
        .unwrap_or(DEFAULT_HISTORY_HOURS)
        .clamp(1, MAX_HISTORY_HOURS);
    let since = Utc::now() - Duration::hours(hours);
    persistence::list_snapshots_since(db, &agent_id, since)
        .await
        .map(Json)
        .map_err(|e| {
            warn!("history read for {} failed: {}", agent_id, e);
            StatusCode::SERVICE_UNAVAILABLE
        })
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/prices", get(prices))
        .route("/api/models", get(models))
        .route("/api/models/{agent_id}/history", get(model_history))
        .route("/api/trades", get(recent_trades))
        .route("/api/trades/open", get(open_trades))
        .route("/api/decisions", get(recent_decisions))
        .with_state(state)
}
