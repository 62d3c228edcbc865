use axum::{extract::State, Json};

use super::AppState;
use crate::error::Result;
use crate::model::record::{IssueListing, RefreshSummary};

pub async fn list_issues(State(state): State<AppState>) -> Result<Json<IssueListing>> {
    Ok(Json(state.service.list_issues()?))
}

/// Tracker failures fall back to the cache, so this only fails if the
/// refreshed set cannot be stored.
pub async fn refresh_issues(State(state): State<AppState>) -> Result<Json<RefreshSummary>> {
    Ok(Json(state.service.refresh_issues().await?))
}

pub async fn status(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let summary = state.service.status()?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "cards": summary.cards,
        "issues": summary.issues,
    })))
}
