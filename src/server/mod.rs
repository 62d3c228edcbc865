mod cards;
mod issues;


use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::error::BoardError;
use crate::issues::{create_source, IssueCache};
use crate::service::RoadmapService;
use crate::store::SqliteStore;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RoadmapService>,
}

/// HTTP API routes.
///
///   GET    /issues          -> unplaced issues (+ last refresh time)
///   GET    /issues/refresh  -> pull issues from the tracker
///   GET    /cards           -> all placed cards
///   POST   /cards           -> place a card (server assigns the id)
///   POST   /cards/batch     -> seed cards, client ids allowed
///   GET    /cards/{id}      -> one card
///   PATCH  /cards/{id}      -> partial update
///   DELETE /cards/{id}      -> remove a card
///   GET    /status          -> health check
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/issues", get(issues::list_issues))
        .route("/issues/refresh", get(issues::refresh_issues))
        .route("/cards", get(cards::list_cards).post(cards::create_card))
        .route("/cards/batch", post(cards::create_batch))
        .route(
            "/cards/{id}",
            get(cards::get_card)
                .patch(cards::update_card)
                .delete(cards::delete_card),
        )
        .route("/status", get(issues::status))
        .layer(cors)
        .with_state(state)
}

/// Open the store, load the issue cache and serve until Ctrl-C.
pub async fn serve(config: &AppConfig, port: Option<u16>) -> Result<()> {
    let db_path = config.database_path();
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("Failed to open database {}", db_path.display()))?,
    );
    let cache = IssueCache::new(store.clone(), create_source(config))
        .context("Failed to load cached issues")?;
    let service = RoadmapService::new(store, cache).context("Failed to load cards")?;
    let app = router(AppState {
        service: Arc::new(service),
    });

    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    tracing::info!(addr = %addr, db = %db_path.display(), "roadmap server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("HTTP server error")?;
    Ok(())
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn log_api_issue(status: StatusCode, message: &str) {
    if status.is_server_error() {
        tracing::error!(%status, "{message}");
    } else {
        tracing::warn!(%status, "{message}");
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = match &self {
            BoardError::CardNotFound(_) => StatusCode::NOT_FOUND,
            BoardError::Validation(_) => StatusCode::BAD_REQUEST,
            BoardError::DuplicateCard(_) => StatusCode::CONFLICT,
            BoardError::Database(_) | BoardError::Serialization(_) | BoardError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let detail = self.to_string();
        log_api_issue(status, &detail);
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            detail
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Malformed or schema-violating bodies are client errors.
fn rejected(rejection: JsonRejection) -> BoardError {
    BoardError::Validation(rejection.body_text())
}
