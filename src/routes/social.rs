// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friends, friend requests, friend-code search, reminders.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{FriendLink, FriendRequest, UserProfile};
use crate::routes::api::NotificationResponse;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/friends", get(get_friends))
        .route("/api/friends/search", get(search_by_tag))
        .route("/api/friends/{id}", delete(remove_friend))
        .route("/api/friends/{id}/remind", post(send_reminder))
        .route(
            "/api/friend-requests",
            get(get_friend_requests).post(send_friend_request),
        )
        .route("/api/friend-requests/{id}/accept", post(accept_friend_request))
        .route("/api/friend-requests/{id}/decline", post(decline_friend_request))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct FriendResponse {
    pub uid: String,
    pub name: String,
    pub tag: String,
    #[serde(rename = "photoURL")]
    pub photo_url: String,
    pub since: Option<String>,
}

impl From<FriendLink> for FriendResponse {
    fn from(link: FriendLink) -> Self {
        Self {
            uid: link.friend_id,
            name: link.name,
            tag: link.tag,
            photo_url: link.photo_url,
            since: link.since.map(format_utc_rfc3339),
        }
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestResponse {
    pub id: String,
    pub from_uid: String,
    pub from_name: String,
    pub from_tag: String,
    pub from_photo: String,
    pub created_at: Option<String>,
}

impl From<FriendRequest> for FriendRequestResponse {
    fn from(request: FriendRequest) -> Self {
        Self {
            id: request.id,
            from_uid: request.from_uid,
            from_name: request.from_name,
            from_tag: request.from_tag,
            from_photo: request.from_photo,
            created_at: request.created_at.map(format_utc_rfc3339),
        }
    }
}

/// Search hit: only what the add-friend card shows.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub uid: String,
    pub display_name: String,
    pub user_tag: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl From<UserProfile> for SearchResult {
    fn from(profile: UserProfile) -> Self {
        Self {
            uid: profile.id,
            display_name: profile.display_name,
            user_tag: profile.tag,
            photo_url: profile.photo_url,
        }
    }
}

async fn get_friends(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<FriendResponse>>> {
    let friends = state.social.list_friends(&user.uid).await?;
    Ok(Json(friends.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
struct SearchQuery {
    tag: String,
}

async fn search_by_tag(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>> {
    let profiles = state.social.search_by_tag(&user.uid, &query.tag).await?;
    Ok(Json(profiles.into_iter().map(Into::into).collect()))
}

async fn remove_friend(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(friend_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.social.remove_friend(&user.uid, &friend_id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn send_reminder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(friend_id): Path<String>,
) -> Result<Json<NotificationResponse>> {
    let notification = state.social.send_reminder(&user.uid, &friend_id).await?;
    Ok(Json(notification.into()))
}

async fn get_friend_requests(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<FriendRequestResponse>>> {
    let requests = state.social.list_friend_requests(&user.uid).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequestBody {
    target_uid: String,
}

async fn send_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SendRequestBody>,
) -> Result<Json<FriendRequestResponse>> {
    let request = state
        .social
        .send_friend_request(&user.uid, &body.target_uid)
        .await?;
    Ok(Json(request.into()))
}

async fn accept_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<FriendResponse>> {
    let link = state
        .social
        .accept_friend_request(&user.uid, &request_id)
        .await?;
    Ok(Json(link.into()))
}

async fn decline_friend_request(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(request_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state
        .social
        .decline_friend_request(&user.uid, &request_id)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}
