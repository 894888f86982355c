// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recorded drops and user-curated highlights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded drop, stored at `users/{uid}/falls/{auto}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallEvent {
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: String,
    /// Estimated drop height in meters
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub bounces: u32,
    /// Server-assigned; `None` while a write is still pending
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notable: bool,
}

/// A fall the user chose to annotate, stored at `users/{uid}/notableFalls/{auto}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotableFall {
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub height: f64,
    #[serde(default)]
    pub bounces: u32,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}
