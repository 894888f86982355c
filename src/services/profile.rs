// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User-document synchronizer.
//!
//! Runs after every successful sign-in and makes sure the identity has a
//! profile document with a unique tag and a stats block.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{Identity, ProfileFields, ProfileRefresh, ProfileStats, UserProfile};
use crate::services::feed::{ChangeFeed, UserEvent};
use crate::services::tags::allocate_unique_tag;

/// Longest display name accepted from the edit-profile form.
pub const MAX_DISPLAY_NAME_LEN: usize = 50;

/// Creates and repairs profile documents.
#[derive(Clone)]
pub struct ProfileSynchronizer {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
}

impl ProfileSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Ensure a profile exists for `identity` and is up to date.
    ///
    /// New identities get a two-phase creation: the profile is written first
    /// (tag `None`, zeroed stats) because reserving a tag is only authorized
    /// once the caller's own profile exists; the tag is patched in afterwards.
    /// Existing profiles get their refreshable fields updated and a missing
    /// tag or stats block backfilled. An assigned tag is never replaced.
    pub async fn ensure_profile(&self, identity: &Identity) -> Result<UserProfile> {
        let uid = identity.uid.as_str();
        let fields = ProfileFields::from_identity(identity);

        match self.store.get_profile(uid).await? {
            None => {
                tracing::info!(uid, "Creating new user profile");
                self.store.create_profile(uid, &fields).await?;

                let tag = self.allocate_tag().await?;
                self.store.set_profile_tag(uid, &tag).await?;
                tracing::info!(uid, tag = %tag, "Assigned user tag");
            }
            Some(existing) => {
                tracing::debug!(uid, "Refreshing existing user profile");

                let tag = match existing.tag {
                    Some(_) => None,
                    None => {
                        tracing::info!(uid, "Backfilling missing user tag");
                        Some(self.allocate_tag().await?)
                    }
                };
                let stats = existing.stats.is_none().then(ProfileStats::default);

                self.store
                    .refresh_profile(uid, &ProfileRefresh { fields, tag, stats })
                    .await?;
            }
        }

        self.feed.publish(uid, UserEvent::ProfileChanged);

        self.store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))
    }

    /// Rename the profile (edit-profile form).
    pub async fn update_display_name(&self, uid: &str, name: &str) -> Result<UserProfile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("Name cannot be empty.".to_string()));
        }
        if name.chars().count() > MAX_DISPLAY_NAME_LEN {
            return Err(AppError::BadRequest(format!(
                "Name must be at most {} characters.",
                MAX_DISPLAY_NAME_LEN
            )));
        }

        self.store.set_display_name(uid, name).await?;
        tracing::info!(uid, "Display name updated");
        self.feed.publish(uid, UserEvent::ProfileChanged);

        self.get_profile(uid).await
    }

    pub async fn get_profile(&self, uid: &str) -> Result<UserProfile> {
        self.store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))
    }

    async fn allocate_tag(&self) -> Result<String> {
        let mut rng = StdRng::from_entropy();
        allocate_unique_tag(self.store.as_ref(), &mut rng).await
    }
}
