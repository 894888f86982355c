// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public sign-in helpers used before an identity exists.

use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::services::session::{report_auth_error, resolve_email_flow, validate_email_credentials};
use crate::services::EmailFlow;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/errors", post(auth_error_message))
        .route("/api/auth/email-flow", post(email_flow))
}

#[derive(Deserialize)]
struct AuthErrorRequest {
    code: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthErrorResponse {
    /// `null` when the error should be ignored (user closed the popup)
    pub message: Option<String>,
}

/// Translate a provider error code into the message to show.
async fn auth_error_message(Json(body): Json<AuthErrorRequest>) -> Json<AuthErrorResponse> {
    Json(AuthErrorResponse {
        message: report_auth_error(&body.code).map(str::to_string),
    })
}

#[derive(Deserialize)]
struct EmailFlowRequest {
    email: String,
    password: String,
    /// Sign-in methods the provider reports for this address
    #[serde(default)]
    methods: Vec<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct EmailFlowResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub flow: EmailFlow,
}

/// Pre-validate the email form and pick sign-in vs. account creation.
async fn email_flow(Json(body): Json<EmailFlowRequest>) -> Result<Json<EmailFlowResponse>> {
    validate_email_credentials(&body.email, &body.password)?;
    let flow = resolve_email_flow(&body.methods)?;
    Ok(Json(EmailFlowResponse { flow }))
}
