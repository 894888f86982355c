// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Friend requests and mirrored friend links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserProfile;

/// Pending invitation stored under the recipient at
/// `users/{recipient}/friendRequests/{auto}`.
///
/// Carries the sender's display data so the recipient can render it
/// without a further lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub from_uid: String,
    #[serde(default)]
    pub from_name: String,
    #[serde(default)]
    pub from_tag: String,
    #[serde(default)]
    pub from_photo: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    /// Build an unsaved request from the sender's profile.
    pub fn from_sender(sender: &UserProfile) -> Self {
        Self {
            id: String::new(),
            from_uid: sender.id.clone(),
            from_name: sender.display_name.clone(),
            from_tag: sender.tag.clone().unwrap_or_default(),
            from_photo: sender.photo_url.clone().unwrap_or_default(),
            created_at: None,
        }
    }
}

/// One half of a symmetric friendship, stored at `users/{owner}/friends/{friend}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendLink {
    /// Friend's identity ID (document ID)
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub friend_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub since: Option<DateTime<Utc>>,
}

impl FriendLink {
    /// Link pointing at the sender of a request, owned by the recipient.
    pub fn to_sender(request: &FriendRequest, since: DateTime<Utc>) -> Self {
        Self {
            friend_id: request.from_uid.clone(),
            name: request.from_name.clone(),
            tag: request.from_tag.clone(),
            photo_url: request.from_photo.clone(),
            since: Some(since),
        }
    }

    /// Link pointing at a profile, owned by someone else.
    pub fn to_profile(profile: &UserProfile, since: DateTime<Utc>) -> Self {
        Self {
            friend_id: profile.id.clone(),
            name: profile.display_name.clone(),
            tag: profile.tag.clone().unwrap_or_default(),
            photo_url: profile.photo_url.clone().unwrap_or_default(),
            since: Some(since),
        }
    }
}
