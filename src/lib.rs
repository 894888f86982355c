// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! BeCareful: track how often (and how far) you drop your phone.
//!
//! This crate provides the backend API behind the BeCareful PWA: sign-in
//! and profile sync, fall detection from accelerometer samples, fall
//! history and charts, friends, reminders, and leaderboards.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::DocumentStore;
use services::{
    ChangeFeed, FallRecorder, IdTokenVerifier, MotionConfig, MotionSessions, ProfileSynchronizer,
    SessionBinder, SocialGraph, ViewService,
};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn DocumentStore>,
    pub feed: ChangeFeed,
    pub verifier: Arc<IdTokenVerifier>,
    pub profiles: ProfileSynchronizer,
    pub session: SessionBinder,
    pub recorder: FallRecorder,
    pub social: SocialGraph,
    pub views: ViewService,
    pub motion: MotionSessions,
}

impl AppState {
    /// Wire every service to one store and one change feed.
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        feed: ChangeFeed,
        verifier: Arc<IdTokenVerifier>,
    ) -> Self {
        let profiles = ProfileSynchronizer::new(store.clone(), feed.clone());
        let session = SessionBinder::new(profiles.clone(), config.token_freshness_secs);
        let recorder = FallRecorder::new(store.clone(), feed.clone());
        let motion_config = MotionConfig {
            fall_timeout_ms: config.fall_timeout_ms,
            ..MotionConfig::default()
        };

        Self {
            session,
            social: SocialGraph::new(store.clone(), feed.clone()),
            views: ViewService::new(store.clone()),
            motion: MotionSessions::new(motion_config, recorder.clone()),
            recorder,
            profiles,
            config,
            store,
            feed,
            verifier,
        }
    }
}
