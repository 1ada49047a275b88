//! Control protocol request handlers
//!
//! One handler per route. Every successful control request (play, stop,
//! pause, evaluate, validate) resets the inactivity timer; health and current
//! are side-effect-free probes and deliberately do not.
//!
//! State commits happen only after the engine call succeeded, so a failed
//! evaluation leaves the prior snapshot untouched.

use crate::AppContext;
use axum::{extract::State, http::StatusCode, Json};
use tapedeck_common::api::{
    CurrentResponse, ErrorResponse, EvaluateRequest, HealthResponse, OkResponse, PlayRequest,
    PlayResponse, PlaybackStatus, StateResponse, ValidateRequest, ValidateResponse,
};
use tracing::{info, warn};

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn bad_request(error: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            ok: false,
            error: error.into(),
        }),
    )
}

fn internal_error(error: impl std::fmt::Display) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            ok: false,
            error: error.to_string(),
        }),
    )
}

/// GET /health - liveness probe; unreachable means "not running"
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        pid: ctx.pid,
    })
}

/// GET /current - PlaybackState snapshot
pub async fn current(State(ctx): State<AppContext>) -> Json<CurrentResponse> {
    Json(ctx.state.snapshot().await.into())
}

/// POST /play - stop whatever is playing, then evaluate the new code
pub async fn play(
    State(ctx): State<AppContext>,
    Json(req): Json<PlayRequest>,
) -> ApiResult<PlayResponse> {
    if req.code.is_empty() {
        return Err(bad_request("code must not be empty"));
    }

    if ctx.state.snapshot().await.status == PlaybackStatus::Playing {
        ctx.engine.stop();
    }

    if let Err(e) = ctx.engine.evaluate(&req.code) {
        warn!(song = %req.name, version = req.version, "Play failed: {}", e);
        return Err(internal_error(e));
    }

    ctx.state
        .set_playing(Some(req.name.clone()), Some(req.version), req.code)
        .await;
    ctx.state.touch().await;
    info!(song = %req.name, version = req.version, "Playing");

    Ok(Json(PlayResponse {
        ok: true,
        name: req.name,
        version: req.version,
        state: PlaybackStatus::Playing,
    }))
}

/// POST /stop - idempotent engine stop, clears the song identity
pub async fn stop(State(ctx): State<AppContext>) -> ApiResult<StateResponse> {
    ctx.engine.stop();
    ctx.state.set_stopped().await;
    ctx.state.touch().await;
    info!("Stopped");

    Ok(Json(StateResponse {
        ok: true,
        state: PlaybackStatus::Stopped,
    }))
}

/// POST /pause - playing becomes paused; stopped stays stopped without error
pub async fn pause(State(ctx): State<AppContext>) -> ApiResult<StateResponse> {
    ctx.engine.pause();
    let state = ctx.state.set_paused().await;
    ctx.state.touch().await;
    info!(state = %state, "Paused");

    Ok(Json(StateResponse { ok: true, state }))
}

/// POST /evaluate - replace the running pattern without stopping first
///
/// Relies on the engine's seamless pattern replacement; used for find-replace
/// updates, version rollback, and scripted sequencing. Name/version are
/// retained from the prior snapshot when not supplied.
pub async fn evaluate(
    State(ctx): State<AppContext>,
    Json(req): Json<EvaluateRequest>,
) -> ApiResult<OkResponse> {
    if req.code.is_empty() {
        return Err(bad_request("code must not be empty"));
    }

    if let Err(e) = ctx.engine.evaluate(&req.code) {
        warn!("Evaluate failed: {}", e);
        return Err(internal_error(e));
    }

    let prior = ctx.state.snapshot().await;
    ctx.state
        .set_playing(
            req.name.or(prior.name),
            req.version.or(prior.version),
            req.code,
        )
        .await;
    ctx.state.touch().await;

    Ok(Json(OkResponse { ok: true }))
}

/// POST /validate - syntax check only; no playback state change
pub async fn validate(
    State(ctx): State<AppContext>,
    Json(req): Json<ValidateRequest>,
) -> ApiResult<ValidateResponse> {
    if req.code.is_empty() {
        return Err(bad_request("code must not be empty"));
    }

    let outcome = ctx.engine.validate(&req.code);
    ctx.state.touch().await;

    Ok(Json(ValidateResponse {
        ok: true,
        valid: outcome.valid,
        error: outcome.message,
        line: outcome.line,
        column: outcome.column,
    }))
}
