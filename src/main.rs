// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! BeCareful API Server
//!
//! Backend for the BeCareful phone-drop tracker PWA: verifies Firebase ID
//! tokens, keeps profiles in Firestore, classifies accelerometer samples,
//! and serves fall history, friends and leaderboards.

use becareful::{
    config::{Config, StoreBackend},
    db::{DocumentStore, FirestoreDb, MemoryStore},
    services::{ChangeFeed, IdTokenVerifier},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, store = ?config.store, "Starting BeCareful API");

    let store: Arc<dyn DocumentStore> = match config.store {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.firebase_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier = Arc::new(IdTokenVerifier::new(&config)?);

    // Build shared state
    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        ChangeFeed::new(),
        verifier,
    ));

    // Build router
    let app = becareful::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("becareful=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
