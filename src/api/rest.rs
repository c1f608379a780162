// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only views over the most recent pipeline run, all under `/api/v1/`.
// `POST /api/v1/refresh` reruns the pipeline from the configured input files,
// rewrites the output directory and publishes the new tables.
//
// CORS is configured permissively; the API only ever serves derived tables.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::api::error::{AppError, AppResult};
use crate::app_state::{AppState, ErrorRecord};
use crate::indicators::IndicatorRow;
use crate::output::write_tables;
use crate::pipeline::{run_from_files, PipelineOutput};
use crate::types::Frequency;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/watchlist", get(watchlist))
        .route("/api/v1/coverage", get(coverage))
        .route("/api/v1/latest/:frequency", get(latest))
        .route("/api/v1/indicators/:symbol", get(indicators))
        .route("/api/v1/failures", get(failures))
        .route("/api/v1/refresh", post(refresh))
        .layer(cors)
        .with_state(state)
}

fn published(state: &AppState) -> AppResult<Arc<PipelineOutput>> {
    state.output().ok_or(AppError::NotReady)
}

fn parse_frequency(raw: &str) -> AppResult<Frequency> {
    raw.parse::<Frequency>().map_err(AppError::BadRequest)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    uptime_secs: u64,
    digest: Option<String>,
    horizon: Option<chrono::NaiveDate>,
    last_error: Option<ErrorRecord>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let output = state.output();
    let resp = HealthResponse {
        status: if output.is_some() { "ok" } else { "empty" },
        state_version: state.current_state_version(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        digest: output.as_ref().map(|o| o.digest.clone()),
        horizon: output.as_ref().and_then(|o| o.horizon),
        last_error: state.last_error(),
    };
    Json(resp)
}

// =============================================================================
// Tables
// =============================================================================

async fn watchlist(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let output = published(&state)?;
    Ok(Json(output.watchlist.clone()))
}

async fn coverage(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let output = published(&state)?;
    Ok(Json(output.coverage.clone()))
}

async fn failures(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let output = published(&state)?;
    Ok(Json(output.failures.clone()))
}

async fn latest(
    State(state): State<Arc<AppState>>,
    Path(frequency): Path<String>,
) -> AppResult<impl IntoResponse> {
    let frequency = parse_frequency(&frequency)?;
    let output = published(&state)?;
    Ok(Json(output.latest(frequency).to_vec()))
}

#[derive(Deserialize)]
struct IndicatorQuery {
    frequency: Option<String>,
}

#[derive(Serialize)]
struct IndicatorResponse {
    instrument_id: String,
    frequency: Frequency,
    rows: Vec<IndicatorRow>,
}

async fn indicators(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
    Query(query): Query<IndicatorQuery>,
) -> AppResult<impl IntoResponse> {
    let frequency = match query.frequency.as_deref() {
        Some(raw) => parse_frequency(raw)?,
        None => Frequency::Daily,
    };
    let output = published(&state)?;
    let series = output
        .series(frequency, &symbol)
        .ok_or_else(|| AppError::NotFound(format!("no {frequency} series for {symbol}")))?;

    Ok(Json(IndicatorResponse {
        instrument_id: series.instrument_id.clone(),
        frequency,
        rows: series.rows.clone(),
    }))
}

// =============================================================================
// Refresh
// =============================================================================

#[derive(Serialize)]
struct RefreshResponse {
    state_version: u64,
    digest: String,
    instruments: usize,
    failures: usize,
}

async fn refresh(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let _guard = state.refresh_lock.lock().await;
    let config = state.config();

    let result = tokio::task::spawn_blocking(move || {
        let output = run_from_files(&config)?;
        write_tables(&config.output_dir, &output)?;
        Ok::<_, anyhow::Error>(output)
    })
    .await
    .map_err(|e| AppError::Internal(format!("refresh task failed: {e}")))?;

    match result {
        Ok(output) => {
            let digest = output.digest.clone();
            let instruments = output.daily.len();
            let failures = output.failures.len();
            let version = state.publish(output);
            info!(version, digest = %digest, "tables refreshed");
            Ok(Json(RefreshResponse {
                state_version: version,
                digest,
                instruments,
                failures,
            }))
        }
        Err(e) => {
            warn!(error = %e, "refresh failed, keeping previous tables");
            state.record_error(format!("{e:#}"));
            Err(e.into())
        }
    }
}
