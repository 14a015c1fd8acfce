//! Sniffer HTTP service.
//!
//! Exposes the single pipeline operation over HTTP plus a health
//! probe. All request semantics live in the `sniffer` crate; this
//! binary only wires collaborators from configuration and maps
//! errors to status codes.

mod config;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use sniffer::{
    FirecrawlScraper, GeminiSearcher, OpenAiAnalyzer, PostgresStore, Sniffer, UseCaseStore,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::{health_handler, sniff_handler, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sniffer=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    tracing::info!("Starting Sniffer Server");

    let config = Config::from_env()?;

    // Database setup
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .context("failed to connect to database")?;

    // Use-case bundles: compiled-in, optionally layered from a file
    let use_cases = match &config.use_cases_path {
        Some(path) => UseCaseStore::from_json_file(path)
            .with_context(|| format!("failed to load use cases from {path}"))?,
        None => UseCaseStore::builtin(),
    };

    // Collaborators
    let analyzer = OpenAiAnalyzer::new(&config.openai_api_key);
    let scraper = FirecrawlScraper::new(&config.firecrawl_api_key)
        .map_err(|e| anyhow::anyhow!("failed to build scraper: {e}"))?;
    let searcher = GeminiSearcher::new(&config.gemini_api_key);
    let store = PostgresStore::from_pool(pool.clone());

    let sniffer =
        Sniffer::new(analyzer, scraper, searcher, store).with_use_cases(use_cases);

    let state = AppState {
        sniffer: Arc::new(sniffer),
        db_pool: pool,
    };

    let app = Router::new()
        .route("/api/v1/sniff", post(sniff_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
