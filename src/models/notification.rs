// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-user inbox items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Inbox item stored at `users/{uid}/notifications/{auto}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub read: bool,
    /// Page the PWA opens when the item is tapped
    #[serde(default)]
    pub link_to: Option<String>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Notification {
    fn unread(title: impl Into<String>, body: String, link_to: &str) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            body,
            read: false,
            link_to: Some(link_to.to_string()),
            created_at: None,
        }
    }

    /// Summary emitted after a fall is recorded.
    pub fn fall_recorded(distance_m: f64, bounces: u32) -> Self {
        let plural = if bounces == 1 { "" } else { "s" };
        Self::unread(
            "Fall recorded!",
            format!(
                "You dropped your phone from {:.2}m with {} bounce{}.",
                distance_m, bounces, plural
            ),
            "landing.html#home",
        )
    }

    /// Sent to the original requester once their request is accepted.
    pub fn friend_request_accepted(accepter_name: &str) -> Self {
        Self::unread(
            "Friend Request Accepted!",
            format!("{} is now your friend!", accepter_name),
            "friends.html",
        )
    }

    /// Nudge from a friend.
    pub fn reminder(sender_name: &str) -> Self {
        Self::unread(
            "BeCareful™ Reminder",
            format!("{} thinks you should be careful 😅", sender_name),
            "landing.html#home",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fall_body_pluralizes_bounces() {
        assert_eq!(
            Notification::fall_recorded(4.9, 1).body,
            "You dropped your phone from 4.90m with 1 bounce."
        );
        assert_eq!(
            Notification::fall_recorded(1.234, 0).body,
            "You dropped your phone from 1.23m with 0 bounces."
        );
    }

    #[test]
    fn producers_create_unread_items() {
        let accepted = Notification::friend_request_accepted("Vera");
        assert!(!accepted.read);
        assert_eq!(accepted.body, "Vera is now your friend!");
        assert_eq!(accepted.link_to.as_deref(), Some("friends.html"));
    }
}
