use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use sniffer::{
    FirecrawlScraper, GeminiSearcher, OpenAiAnalyzer, PostgresStore, SniffOutcome, SniffRequest,
    Sniffer, SnifferError,
};
use sqlx::PgPool;

/// The concrete pipeline this server drives.
pub type AppSniffer = Sniffer<OpenAiAnalyzer, FirecrawlScraper, GeminiSearcher, PostgresStore>;

#[derive(Clone)]
pub struct AppState {
    pub sniffer: Arc<AppSniffer>,
    pub db_pool: PgPool,
}

/// The single failure shape leaving the service.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

fn error_response(err: SnifferError) -> (StatusCode, Json<ErrorResponse>) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(ErrorResponse {
            detail: err.to_string(),
        }),
    )
}

/// Process one scrape/classify/persist request.
pub async fn sniff_handler(
    State(state): State<AppState>,
    Json(request): Json<SniffRequest>,
) -> Result<Json<SniffOutcome>, (StatusCode, Json<ErrorResponse>)> {
    tracing::info!(urls = ?request.urls, "received sniff request");
    state
        .sniffer
        .process(&request)
        .await
        .map(Json)
        .map_err(error_response)
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    database: String,
}

/// Health check endpoint
///
/// Returns 200 OK when the database responds, 503 otherwise.
pub async fn health_handler(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = match tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&state.db_pool),
    )
    .await
    {
        Ok(Ok(_)) => "ok".to_string(),
        Ok(Err(e)) => format!("query failed: {e}"),
        Err(_) => "query timeout (>5s)".to_string(),
    };

    let healthy = database == "ok";
    (
        if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        },
        Json(HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            database,
        }),
    )
}
