// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Accelerometer ingestion and fall confirmation.
//!
//! The client streams batches of samples stamped with its own monotonic
//! clock; confirmation carries a timestamp from the same clock so the
//! bounce window lines up with the samples that follow.

use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::services::{AccelSample, MotionEvent, MotionState};
use crate::AppState;

/// Largest sample batch accepted in one request.
const MAX_BATCH: usize = 2000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/motion/samples", post(ingest_samples))
        .route("/api/motion/tick", post(tick))
        .route("/api/motion/confirm", post(confirm))
        .route("/api/motion/reject", post(reject))
        .route("/api/motion/simulate", post(simulate))
}

#[derive(Serialize)]
pub struct MotionResponse {
    pub events: Vec<MotionEvent>,
    pub state: &'static str,
}

fn state_name(state: &MotionState) -> &'static str {
    match state {
        MotionState::Idle => "idle",
        MotionState::Falling { .. } => "falling",
        MotionState::AwaitingConfirmation { .. } => "awaiting_confirmation",
        MotionState::BounceWindow { .. } => "bounce_window",
    }
}

#[derive(Deserialize)]
struct SamplesBody {
    samples: Vec<AccelSample>,
}

async fn ingest_samples(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SamplesBody>,
) -> Result<Json<MotionResponse>> {
    if body.samples.len() > MAX_BATCH {
        return Err(crate::error::AppError::BadRequest(format!(
            "At most {} samples per batch",
            MAX_BATCH
        )));
    }

    let events = state.motion.ingest(&user.uid, &body.samples).await?;
    Ok(Json(MotionResponse {
        events,
        state: state_name(&state.motion.state(&user.uid)),
    }))
}

#[derive(Deserialize)]
struct ClockBody {
    timestamp_ms: u64,
}

/// Advance timeouts when no samples are arriving.
async fn tick(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ClockBody>,
) -> Result<Json<MotionResponse>> {
    let events = state
        .motion
        .tick(&user.uid, body.timestamp_ms)
        .await?
        .into_iter()
        .collect();
    Ok(Json(MotionResponse {
        events,
        state: state_name(&state.motion.state(&user.uid)),
    }))
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<ClockBody>,
) -> Result<Json<MotionResponse>> {
    state.motion.confirm(&user.uid, body.timestamp_ms)?;
    tracing::info!(uid = %user.uid, "Fall confirmed; counting bounces");
    Ok(Json(MotionResponse {
        events: Vec::new(),
        state: state_name(&state.motion.state(&user.uid)),
    }))
}

async fn reject(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MotionResponse>> {
    state.motion.reject(&user.uid)?;
    tracing::info!(uid = %user.uid, "Fall rejected");
    Ok(Json(MotionResponse {
        events: Vec::new(),
        state: state_name(&state.motion.state(&user.uid)),
    }))
}

#[derive(Deserialize)]
struct SimulateBody {
    distance_m: f64,
}

/// Jump straight to a pending fall ("Simulate drop" button).
async fn simulate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SimulateBody>,
) -> Result<Json<MotionResponse>> {
    if !body.distance_m.is_finite() || body.distance_m < 0.0 {
        return Err(crate::error::AppError::BadRequest(
            "Distance must be a non-negative number.".to_string(),
        ));
    }
    let event = state.motion.simulate_fall(&user.uid, body.distance_m);
    Ok(Json(MotionResponse {
        events: vec![event],
        state: state_name(&state.motion.state(&user.uid)),
    }))
}
