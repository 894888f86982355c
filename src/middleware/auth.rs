// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! ID token authentication middleware.

use crate::error::AppError;
use crate::services::VerifiedCredential;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie the PWA may use instead of an `Authorization` header.
pub const TOKEN_COOKIE: &str = "becareful_token";

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub credential: VerifiedCredential,
}

/// Middleware that requires a valid ID token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Header first, then cookie
    let token = match request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h
            .strip_prefix("Bearer ")
            .map(str::to_string)
            .ok_or(AppError::Unauthorized)?,
        None => jar
            .get(TOKEN_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AppError::Unauthorized)?,
    };

    let credential = state.verifier.verify(&token).await?;

    let auth_user = AuthUser {
        uid: credential.identity.uid.clone(),
        credential,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
