// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fall-event recorder.
//!
//! Persists a confirmed drop against the caller's own profile. The writes
//! are independent round-trips (stats increment, fall log append, inbox
//! append), so a failure partway leaves earlier writes in place; the error
//! is logged with the step that failed and returned to the caller.

use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{FallEvent, NotableFall, Notification, StatsDelta};
use crate::services::feed::{ChangeFeed, UserEvent};

/// Longest note accepted on a notable fall.
pub const MAX_NOTE_LEN: usize = 280;

/// Outcome of [`FallRecorder::record_fall`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFall {
    pub fall_id: String,
    pub notification: Notification,
}

#[derive(Clone)]
pub struct FallRecorder {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
}

impl FallRecorder {
    pub fn new(store: Arc<dyn DocumentStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Record a confirmed fall.
    ///
    /// Order: stats increments, then the fall record, then the summary
    /// notification.
    pub async fn record_fall(&self, uid: &str, distance_m: f64, bounces: u32) -> Result<RecordedFall> {
        validate_distance(distance_m)?;

        self.store
            .increment_stats(uid, &StatsDelta::fall(distance_m, bounces))
            .await
            .inspect_err(|e| tracing::error!(uid, error = %e, "Failed to increment fall stats"))?;

        let fall = FallEvent {
            id: String::new(),
            height: distance_m,
            bounces,
            created_at: None,
            notable: false,
        };
        let fall_id = self
            .store
            .add_fall(uid, &fall)
            .await
            .inspect_err(|e| tracing::error!(uid, error = %e, "Failed to append fall record"))?;

        let mut notification = Notification::fall_recorded(distance_m, bounces);
        notification.id = self
            .store
            .add_notification(uid, &notification)
            .await
            .inspect_err(|e| {
                tracing::error!(uid, fall_id = %fall_id, error = %e, "Failed to add fall notification")
            })?;

        tracing::info!(uid, fall_id = %fall_id, distance_m, bounces, "Fall recorded");

        self.feed.publish(uid, UserEvent::FallsChanged);
        self.feed.publish(uid, UserEvent::ProfileChanged);
        self.feed
            .publish(uid, UserEvent::NotificationAdded(notification.clone()));

        Ok(RecordedFall {
            fall_id,
            notification,
        })
    }

    /// Save an annotated highlight. Independent of the stats and inbox.
    pub async fn record_notable_fall(
        &self,
        uid: &str,
        note: &str,
        distance_m: f64,
        bounces: u32,
    ) -> Result<NotableFall> {
        validate_distance(distance_m)?;
        let note = note.trim();
        if note.chars().count() > MAX_NOTE_LEN {
            return Err(AppError::BadRequest(format!(
                "Note must be at most {} characters.",
                MAX_NOTE_LEN
            )));
        }

        let mut notable = NotableFall {
            id: String::new(),
            note: note.to_string(),
            height: distance_m,
            bounces,
            created_at: None,
        };
        notable.id = self.store.add_notable_fall(uid, &notable).await?;
        tracing::info!(uid, notable_id = %notable.id, "Notable fall saved");

        self.feed.publish(uid, UserEvent::FallsChanged);
        Ok(notable)
    }
}

fn validate_distance(distance_m: f64) -> Result<()> {
    if !distance_m.is_finite() || distance_m < 0.0 {
        return Err(AppError::BadRequest(
            "Distance must be a non-negative number.".to_string(),
        ));
    }
    Ok(())
}
