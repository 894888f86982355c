// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use becareful::error::AppError;
use becareful::models::AuthErrorCode;

async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_tag_space_exhausted_hides_details() {
    let (status, body) = render(AppError::TagSpaceExhausted(10)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "tag_space_exhausted");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_stale_token_is_unauthorized() {
    let (status, body) = render(AppError::StaleToken).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "stale_token");
}

#[tokio::test]
async fn test_auth_errors_carry_user_message() {
    let (status, body) = render(AppError::Auth(AuthErrorCode::TooManyRequests)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        "Too many failed attempts. Please try again later."
    );

    // Cancelled popups are silent
    let (status, body) = render(AppError::Auth(AuthErrorCode::PopupCancelled)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_internal_errors_do_not_leak() {
    let (status, body) = render(AppError::Database("connection reset".to_string())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "database_error");
    assert!(body.get("details").is_none());

    let (status, body) = render(AppError::Internal(anyhow::anyhow!("boom"))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_not_found_includes_message() {
    let (status, body) = render(AppError::NotFound("Friend request x".to_string())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["details"], "Friend request x");
}
