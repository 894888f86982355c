// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use becareful::config::Config;
use becareful::db::{FirestoreDb, MemoryStore};
use becareful::models::Identity;
use becareful::routes::create_router;
use becareful::services::{ChangeFeed, IdTokenVerifier};
use becareful::AppState;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Shared secret for test-signed ID tokens.
#[allow(dead_code)]
pub const TEST_SECRET: &[u8] = b"becareful-test-signing-secret";
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

#[allow(dead_code)]
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Identity with a display name derived from the uid.
#[allow(dead_code)]
pub fn identity(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        display_name: Some(format!("User {}", uid)),
        email: Some(format!("{}@example.com", uid)),
        photo_url: None,
    }
}

/// Sign an ID token for `uid` minted `age_secs` ago.
#[allow(dead_code)]
pub fn id_token(uid: &str, age_secs: u64) -> String {
    let now = now_secs();
    let issued = now - age_secs;
    let claims = serde_json::json!({
        "iss": "https://securetoken.google.com/test-project",
        "aud": "test-project",
        "sub": uid,
        "iat": issued,
        "auth_time": issued,
        "exp": now + 3600,
        "name": format!("User {}", uid),
        "email": format!("{}@example.com", uid),
    });

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(TEST_KID.to_string());
    encode(&header, &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

/// Verifier that accepts tokens from [`id_token`].
#[allow(dead_code)]
pub fn test_verifier(config: &Config) -> Arc<IdTokenVerifier> {
    Arc::new(
        IdTokenVerifier::new_with_static_key(
            config,
            TEST_KID,
            Algorithm::HS256,
            DecodingKey::from_secret(TEST_SECRET),
        )
        .unwrap(),
    )
}

/// Create a test app backed by an in-memory store.
/// Returns the router, the shared state, and the store for assertions.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    let config = Config::test_default();
    let store = MemoryStore::new();
    let verifier = test_verifier(&config);

    let state = Arc::new(AppState::new(
        config,
        Arc::new(store.clone()),
        ChangeFeed::new(),
        verifier,
    ));

    (create_router(state.clone()), state, store)
}

/// Send a JSON request as `uid` (fresh token).
#[allow(dead_code)]
pub async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    uid: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", id_token(uid, 0)));

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Sign `uid` in through the API so their profile exists.
#[allow(dead_code)]
pub async fn sign_in(app: &axum::Router, uid: &str) -> serde_json::Value {
    let response = send(app, "POST", "/api/session", uid, None).await;
    assert_eq!(response.status(), 200, "sign-in failed for {}", uid);
    json_body(response).await
}
