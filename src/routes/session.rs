// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session routes: bind a fresh ID token to a profile, or sign out.

use axum::{
    extract::State,
    routing::post,
    Extension, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::{AuthUser, TOKEN_COOKIE};
use crate::routes::api::ProfileResponse;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/session", post(sign_in).delete(sign_out))
}

/// Complete sign-in: requires a token minted within the freshness window,
/// then creates or refreshes the caller's profile.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.session.sign_in(&user.credential).await?;
    Ok(Json(profile.into()))
}

async fn sign_out(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    state.session.sign_out(&user.uid);
    state.motion.remove(&user.uid);

    let cookie = Cookie::build((TOKEN_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();

    (
        jar.remove(cookie),
        Json(serde_json::json!({ "success": true })),
    )
}
