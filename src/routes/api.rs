// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users: profile, falls, inbox, leaderboards.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FallEvent, NotableFall, Notification, ProfileStats, StatMetric, UserProfile};
use crate::services::views::{available_months, available_years};
use crate::services::{ChartPoint, Grouping, LeaderboardEntry, Period};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// API routes (require authentication via ID token).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me).put(update_me))
        .route("/api/falls", get(get_falls).post(record_fall))
        .route(
            "/api/falls/notable",
            get(get_notable_falls).post(record_notable_fall),
        )
        .route("/api/falls/chart", get(get_chart))
        .route("/api/falls/count", get(get_fall_count))
        .route("/api/notifications", get(get_notifications))
        .route("/api/notifications/{id}/read", post(mark_notification_read))
        .route("/api/leaderboard", get(get_global_leaderboard))
        .route("/api/leaderboard/friends", get(get_friends_leaderboard))
}

// ─── User Profile ────────────────────────────────────────────

/// Current user response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub uid: String,
    pub display_name: String,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub user_tag: Option<String>,
    pub stats: StatsResponse,
    pub private: bool,
    pub created_at: Option<String>,
    pub last_login_at: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_drops: i64,
    pub total_distance: f64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_bounces: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub friends: i64,
}

impl From<ProfileStats> for StatsResponse {
    fn from(stats: ProfileStats) -> Self {
        Self {
            total_drops: stats.total_drops,
            total_distance: stats.total_distance,
            total_bounces: stats.total_bounces,
            friends: stats.friends,
        }
    }
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            stats: profile.stats_or_default().into(),
            uid: profile.id,
            display_name: profile.display_name,
            email: profile.email,
            photo_url: profile.photo_url,
            user_tag: profile.tag,
            private: profile.private,
            created_at: profile.created_at.map(format_utc_rfc3339),
            last_login_at: profile.last_login_at.map(format_utc_rfc3339),
        }
    }
}

async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.profiles.get_profile(&user.uid).await?;
    Ok(Json(profile.into()))
}

#[derive(Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    display_name: String,
}

/// Edit-profile form: rename.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    body.validate()?;
    let profile = state
        .profiles
        .update_display_name(&user.uid, &body.display_name)
        .await?;
    Ok(Json(profile.into()))
}

// ─── Falls ───────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct FallResponse {
    pub id: String,
    pub height: f64,
    pub bounces: u32,
    pub notable: bool,
    pub created_at: Option<String>,
}

impl From<FallEvent> for FallResponse {
    fn from(fall: FallEvent) -> Self {
        Self {
            id: fall.id,
            height: fall.height,
            bounces: fall.bounces,
            notable: fall.notable,
            created_at: fall.created_at.map(format_utc_rfc3339),
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
pub struct FallsResponse {
    pub falls: Vec<FallResponse>,
    /// Options for the chart's year selector
    pub years: Vec<i32>,
    /// `YYYY-MM` options for the month selector, newest first
    pub months: Vec<String>,
}

async fn get_falls(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<FallsResponse>> {
    let falls = state.views.falls(&user.uid).await?;

    Ok(Json(FallsResponse {
        years: available_years(&falls, Utc::now()),
        months: available_months(&falls),
        falls: falls.into_iter().map(FallResponse::from).collect(),
    }))
}

#[derive(Deserialize, Validate)]
struct RecordFallRequest {
    /// Estimated drop height in meters
    #[validate(range(min = 0.0))]
    height: f64,
    bounces: u32,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct RecordFallResponse {
    pub fall_id: String,
    pub notification: NotificationResponse,
}

/// Record a fall measured elsewhere (e.g. a native shell's own detector).
async fn record_fall(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RecordFallRequest>,
) -> Result<Json<RecordFallResponse>> {
    body.validate()?;
    let recorded = state
        .recorder
        .record_fall(&user.uid, body.height, body.bounces)
        .await?;

    Ok(Json(RecordFallResponse {
        fall_id: recorded.fall_id,
        notification: recorded.notification.into(),
    }))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct NotableFallResponse {
    pub id: String,
    pub note: String,
    pub height: f64,
    pub bounces: u32,
    pub created_at: Option<String>,
}

impl From<NotableFall> for NotableFallResponse {
    fn from(fall: NotableFall) -> Self {
        Self {
            id: fall.id,
            note: fall.note,
            height: fall.height,
            bounces: fall.bounces,
            created_at: fall.created_at.map(format_utc_rfc3339),
        }
    }
}

#[derive(Deserialize, Validate)]
struct NotableFallRequest {
    #[validate(length(max = 280))]
    note: String,
    #[validate(range(min = 0.0))]
    height: f64,
    bounces: u32,
}

async fn record_notable_fall(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<NotableFallRequest>,
) -> Result<Json<NotableFallResponse>> {
    body.validate()?;
    let notable = state
        .recorder
        .record_notable_fall(&user.uid, &body.note, body.height, body.bounces)
        .await?;
    Ok(Json(notable.into()))
}

async fn get_notable_falls(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<NotableFallResponse>>> {
    let notable = state.views.notable_falls(&user.uid).await?;
    Ok(Json(notable.into_iter().map(Into::into).collect()))
}

#[derive(Deserialize)]
struct ChartQuery {
    #[serde(default)]
    metric: StatMetric,
    /// Defaults to the current year
    year: Option<i32>,
    #[serde(default)]
    grouping: Grouping,
}

async fn get_chart(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<Vec<ChartPoint>>> {
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    let points = state
        .views
        .chart(&user.uid, query.metric, year, query.grouping)
        .await?;
    Ok(Json(points))
}

#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum CountPeriod {
    Weeks,
    Months,
}

#[derive(Deserialize)]
struct CountQuery {
    /// Look back this many weeks/months from now
    period: Option<CountPeriod>,
    #[serde(default = "default_count")]
    count: u32,
    /// A `YYYY-MM` calendar month; takes precedence over `period`
    month: Option<String>,
}

fn default_count() -> u32 {
    1
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CountResponse {
    pub count: usize,
}

/// Home-page counter.
async fn get_fall_count(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CountQuery>,
) -> Result<Json<CountResponse>> {
    let count = match (query.month, query.period) {
        (Some(month), _) => {
            let (year, month) = parse_month_key(&month)?;
            state.views.count_in_month(&user.uid, year, month).await?
        }
        (None, period) => {
            let period = match period.unwrap_or(CountPeriod::Months) {
                CountPeriod::Weeks => Period::Weeks(query.count),
                CountPeriod::Months => Period::Months(query.count),
            };
            state
                .views
                .count_in_window(&user.uid, Utc::now(), period)
                .await?
        }
    };

    Ok(Json(CountResponse { count }))
}

fn parse_month_key(key: &str) -> Result<(i32, u32)> {
    key.split_once('-')
        .and_then(|(y, m)| Some((y.parse().ok()?, m.parse().ok()?)))
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {}", key)))
}

// ─── Notifications ───────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub link_to: Option<String>,
    pub created_at: Option<String>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            read: n.read,
            link_to: n.link_to,
            created_at: n.created_at.map(format_utc_rfc3339),
        }
    }
}

async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<NotificationResponse>>> {
    let notifications = state.views.notifications(&user.uid).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    state.store.mark_notification_read(&user.uid, &id).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ─── Leaderboards ────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    #[serde(default)]
    metric: StatMetric,
}

async fn get_global_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(state.views.global_leaderboard(query.metric).await?))
}

async fn get_friends_leaderboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>> {
    Ok(Json(
        state
            .views
            .friends_leaderboard(&user.uid, query.metric)
            .await?,
    ))
}
