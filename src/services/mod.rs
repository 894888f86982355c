// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod feed;
pub mod id_token;
pub mod motion;
pub mod profile;
pub mod recorder;
pub mod session;
pub mod social;
pub mod tags;
pub mod views;

pub use feed::{ChangeFeed, NativeNotifier, UserEvent, UserSubscription};
pub use id_token::{IdTokenVerifier, TokenError, VerifiedCredential};
pub use motion::{AccelSample, MotionClassifier, MotionConfig, MotionEvent, MotionSessions, MotionState};
pub use profile::ProfileSynchronizer;
pub use recorder::{FallRecorder, RecordedFall};
pub use session::{EmailFlow, SessionBinder, SessionState};
pub use social::SocialGraph;
pub use views::{ChartPoint, Grouping, LeaderboardEntry, Period, ViewService};
