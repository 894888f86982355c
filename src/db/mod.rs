//! Database layer (Firestore, with an in-process store for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppError;
use crate::models::{
    FallEvent, FriendLink, FriendRequest, NotableFall, Notification, ProfileFields,
    ProfileRefresh, StatMetric, StatsDelta, UserProfile,
};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Friend-code reservations keyed by tag
    pub const USER_TAGS: &str = "userTags";

    // Subcollections of `users/{uid}`
    pub const FALLS: &str = "falls";
    pub const NOTABLE_FALLS: &str = "notableFalls";
    pub const FRIENDS: &str = "friends";
    pub const FRIEND_REQUESTS: &str = "friendRequests";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Hosted document store the app is built on.
///
/// Each method is one round-trip touching one document (or one query), so
/// multi-step flows are sequences of independent writes. The only exception
/// is [`DocumentStore::reserve_tag`], a read-then-create-if-absent transaction.
/// Server-assigned timestamps and auto-IDs are filled in by the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─── Profiles ────────────────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError>;

    /// Write a brand-new profile with no tag and zeroed stats.
    async fn create_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError>;

    /// Patch refreshable fields and `lastLoginAt`; backfill tag/stats when given.
    async fn refresh_profile(&self, uid: &str, refresh: &ProfileRefresh)
        -> Result<(), AppError>;

    async fn set_profile_tag(&self, uid: &str, tag: &str) -> Result<(), AppError>;

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), AppError>;

    async fn find_profiles_by_tag(&self, tag: &str) -> Result<Vec<UserProfile>, AppError>;

    /// Profiles ordered by `metric`, highest first.
    async fn top_profiles(
        &self,
        metric: StatMetric,
        limit: u32,
    ) -> Result<Vec<UserProfile>, AppError>;

    /// Atomic numeric increments on `stats.*`, one field at a time.
    async fn increment_stats(&self, uid: &str, delta: &StatsDelta) -> Result<(), AppError>;

    // ─── Tag reservations ────────────────────────────────────────

    /// Reserve `tag` if nobody holds it.
    ///
    /// Returns `true` when newly reserved, `false` when it already exists.
    async fn reserve_tag(&self, tag: &str) -> Result<bool, AppError>;

    // ─── Falls ───────────────────────────────────────────────────

    async fn add_fall(&self, uid: &str, fall: &FallEvent) -> Result<String, AppError>;

    /// Falls ordered by creation time (oldest first), optionally from `since` on.
    async fn list_falls(
        &self,
        uid: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FallEvent>, AppError>;

    async fn add_notable_fall(&self, uid: &str, fall: &NotableFall) -> Result<String, AppError>;

    async fn list_notable_falls(&self, uid: &str) -> Result<Vec<NotableFall>, AppError>;

    // ─── Friend graph ────────────────────────────────────────────

    async fn add_friend_request(
        &self,
        recipient: &str,
        request: &FriendRequest,
    ) -> Result<String, AppError>;

    async fn get_friend_request(
        &self,
        recipient: &str,
        request_id: &str,
    ) -> Result<Option<FriendRequest>, AppError>;

    async fn list_friend_requests(&self, recipient: &str)
        -> Result<Vec<FriendRequest>, AppError>;

    async fn delete_friend_request(&self, recipient: &str, request_id: &str)
        -> Result<(), AppError>;

    /// Write `owner`'s half of a friendship (document ID = `link.friend_id`).
    async fn set_friend_link(&self, owner: &str, link: &FriendLink) -> Result<(), AppError>;

    async fn get_friend_link(
        &self,
        owner: &str,
        friend_id: &str,
    ) -> Result<Option<FriendLink>, AppError>;

    async fn list_friends(&self, owner: &str) -> Result<Vec<FriendLink>, AppError>;

    async fn delete_friend_link(&self, owner: &str, friend_id: &str) -> Result<(), AppError>;

    // ─── Notifications ───────────────────────────────────────────

    async fn add_notification(
        &self,
        uid: &str,
        notification: &Notification,
    ) -> Result<String, AppError>;

    async fn list_notifications(&self, uid: &str) -> Result<Vec<Notification>, AppError>;

    async fn mark_notification_read(&self, uid: &str, id: &str) -> Result<(), AppError>;
}
