// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Mirrors the Firestore semantics the flows rely on: server timestamps,
//! auto-IDs, updates failing on missing documents, and an atomic
//! create-if-absent for tag reservations. Used by the test suite and by
//! `BECAREFUL_STORE=memory` local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::AppError;
use crate::models::{
    FallEvent, FriendLink, FriendRequest, NotableFall, Notification, ProfileFields,
    ProfileRefresh, ProfileStats, StatMetric, StatsDelta, TagReservation, UserProfile,
};

#[derive(Default)]
struct Inner {
    profiles: DashMap<String, UserProfile>,
    tags: DashMap<String, TagReservation>,
    falls: DashMap<String, Vec<FallEvent>>,
    notable_falls: DashMap<String, Vec<NotableFall>>,
    friend_requests: DashMap<String, Vec<FriendRequest>>,
    friends: DashMap<String, BTreeMap<String, FriendLink>>,
    notifications: DashMap<String, Vec<Notification>>,
    next_id: AtomicU64,
    /// Every reservation attempt reports a collision when set
    saturated_tags: AtomicBool,
    /// Operations that fail with a database error
    faults: DashSet<&'static str>,
    /// Calls per operation, for assertions
    calls: DashMap<&'static str, u64>,
}

/// Cloneable handle to an in-process store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every tag reservation collide, as if the tag space were full.
    pub fn saturate_tags(&self) {
        self.inner.saturated_tags.store(true, Ordering::SeqCst);
    }

    /// Make the named operation (e.g. `"add_notification"`) fail until cleared.
    pub fn inject_fault(&self, op: &'static str) {
        self.inner.faults.insert(op);
    }

    pub fn clear_faults(&self) {
        self.inner.faults.clear();
    }

    /// Number of times the named operation has been called.
    pub fn calls(&self, op: &str) -> u64 {
        self.inner.calls.get(op).map(|c| *c).unwrap_or(0)
    }

    /// Whether `tag` is held in the reservation keyspace.
    pub fn is_tag_reserved(&self, tag: &str) -> bool {
        self.inner.tags.contains_key(tag)
    }

    fn enter(&self, op: &'static str) -> Result<(), AppError> {
        *self.inner.calls.entry(op).or_insert(0) += 1;
        if self.inner.faults.contains(op) {
            return Err(AppError::Database(format!("injected fault: {}", op)));
        }
        Ok(())
    }

    fn auto_id(&self) -> String {
        let n = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        format!("doc{:08}", n)
    }

    fn with_profile<F>(&self, uid: &str, update: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut UserProfile),
    {
        let mut profile = self
            .inner
            .profiles
            .get_mut(uid)
            .ok_or_else(|| AppError::NotFound(format!("No document to update: users/{}", uid)))?;
        update(&mut profile);
        Ok(())
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> Option<DateTime<Utc>>) {
    items.sort_by(|a, b| created_at(b).cmp(&created_at(a)));
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.enter("get_profile")?;
        Ok(self.inner.profiles.get(uid).map(|p| p.clone()))
    }

    async fn create_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError> {
        self.enter("create_profile")?;
        let now = Utc::now();
        self.inner.profiles.insert(
            uid.to_string(),
            UserProfile {
                id: uid.to_string(),
                display_name: fields.display_name.clone(),
                email: fields.email.clone(),
                photo_url: fields.photo_url.clone(),
                tag: None,
                stats: Some(ProfileStats::default()),
                private: fields.private,
                created_at: Some(now),
                last_login_at: Some(now),
            },
        );
        Ok(())
    }

    async fn refresh_profile(
        &self,
        uid: &str,
        refresh: &ProfileRefresh,
    ) -> Result<(), AppError> {
        self.enter("refresh_profile")?;
        self.with_profile(uid, |profile| {
            profile.display_name = refresh.fields.display_name.clone();
            profile.email = refresh.fields.email.clone();
            profile.photo_url = refresh.fields.photo_url.clone();
            profile.private = refresh.fields.private;
            profile.last_login_at = Some(Utc::now());
            if let Some(tag) = &refresh.tag {
                profile.tag = Some(tag.clone());
            }
            if let Some(stats) = &refresh.stats {
                profile.stats = Some(stats.clone());
            }
        })
    }

    async fn set_profile_tag(&self, uid: &str, tag: &str) -> Result<(), AppError> {
        self.enter("set_profile_tag")?;
        self.with_profile(uid, |profile| profile.tag = Some(tag.to_string()))
    }

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), AppError> {
        self.enter("set_display_name")?;
        self.with_profile(uid, |profile| profile.display_name = name.to_string())
    }

    async fn find_profiles_by_tag(&self, tag: &str) -> Result<Vec<UserProfile>, AppError> {
        self.enter("find_profiles_by_tag")?;
        Ok(self
            .inner
            .profiles
            .iter()
            .filter(|p| p.tag.as_deref() == Some(tag))
            .map(|p| p.clone())
            .collect())
    }

    async fn top_profiles(
        &self,
        metric: StatMetric,
        limit: u32,
    ) -> Result<Vec<UserProfile>, AppError> {
        self.enter("top_profiles")?;
        let mut profiles: Vec<UserProfile> =
            self.inner.profiles.iter().map(|p| p.clone()).collect();
        profiles.sort_by(|a, b| {
            metric
                .value_of(&b.stats_or_default())
                .total_cmp(&metric.value_of(&a.stats_or_default()))
        });
        profiles.truncate(limit as usize);
        Ok(profiles)
    }

    async fn increment_stats(&self, uid: &str, delta: &StatsDelta) -> Result<(), AppError> {
        self.enter("increment_stats")?;
        self.with_profile(uid, |profile| {
            let stats = profile.stats.get_or_insert_with(ProfileStats::default);
            stats.total_drops += delta.drops;
            stats.total_distance += delta.distance;
            stats.total_bounces += delta.bounces;
            stats.friends += delta.friends;
        })
    }

    async fn reserve_tag(&self, tag: &str) -> Result<bool, AppError> {
        self.enter("reserve_tag")?;
        if self.inner.saturated_tags.load(Ordering::SeqCst) {
            return Ok(false);
        }
        match self.inner.tags.entry(tag.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(TagReservation {
                    reserved: true,
                    created_at: Some(Utc::now()),
                });
                Ok(true)
            }
        }
    }

    async fn add_fall(&self, uid: &str, fall: &FallEvent) -> Result<String, AppError> {
        self.enter("add_fall")?;
        let id = self.auto_id();
        let mut stored = fall.clone();
        stored.id = id.clone();
        stored.created_at = Some(Utc::now());
        self.inner
            .falls
            .entry(uid.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }

    async fn list_falls(
        &self,
        uid: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FallEvent>, AppError> {
        self.enter("list_falls")?;
        let mut falls: Vec<FallEvent> = self
            .inner
            .falls
            .get(uid)
            .map(|f| f.clone())
            .unwrap_or_default()
            .into_iter()
            .filter(|f| match (since, f.created_at) {
                (Some(since), Some(created)) => created >= since,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .collect();
        falls.sort_by_key(|f| f.created_at);
        Ok(falls)
    }

    async fn add_notable_fall(&self, uid: &str, fall: &NotableFall) -> Result<String, AppError> {
        self.enter("add_notable_fall")?;
        let id = self.auto_id();
        let mut stored = fall.clone();
        stored.id = id.clone();
        stored.created_at = Some(Utc::now());
        self.inner
            .notable_falls
            .entry(uid.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }

    async fn list_notable_falls(&self, uid: &str) -> Result<Vec<NotableFall>, AppError> {
        self.enter("list_notable_falls")?;
        let mut falls = self
            .inner
            .notable_falls
            .get(uid)
            .map(|f| f.clone())
            .unwrap_or_default();
        newest_first(&mut falls, |f| f.created_at);
        Ok(falls)
    }

    async fn add_friend_request(
        &self,
        recipient: &str,
        request: &FriendRequest,
    ) -> Result<String, AppError> {
        self.enter("add_friend_request")?;
        let id = self.auto_id();
        let mut stored = request.clone();
        stored.id = id.clone();
        stored.created_at = Some(Utc::now());
        self.inner
            .friend_requests
            .entry(recipient.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }

    async fn get_friend_request(
        &self,
        recipient: &str,
        request_id: &str,
    ) -> Result<Option<FriendRequest>, AppError> {
        self.enter("get_friend_request")?;
        Ok(self.inner.friend_requests.get(recipient).and_then(|requests| {
            requests.iter().find(|r| r.id == request_id).cloned()
        }))
    }

    async fn list_friend_requests(
        &self,
        recipient: &str,
    ) -> Result<Vec<FriendRequest>, AppError> {
        self.enter("list_friend_requests")?;
        Ok(self
            .inner
            .friend_requests
            .get(recipient)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    async fn delete_friend_request(
        &self,
        recipient: &str,
        request_id: &str,
    ) -> Result<(), AppError> {
        self.enter("delete_friend_request")?;
        if let Some(mut requests) = self.inner.friend_requests.get_mut(recipient) {
            requests.retain(|r| r.id != request_id);
        }
        Ok(())
    }

    async fn set_friend_link(&self, owner: &str, link: &FriendLink) -> Result<(), AppError> {
        self.enter("set_friend_link")?;
        self.inner
            .friends
            .entry(owner.to_string())
            .or_default()
            .insert(link.friend_id.clone(), link.clone());
        Ok(())
    }

    async fn get_friend_link(
        &self,
        owner: &str,
        friend_id: &str,
    ) -> Result<Option<FriendLink>, AppError> {
        self.enter("get_friend_link")?;
        Ok(self
            .inner
            .friends
            .get(owner)
            .and_then(|links| links.get(friend_id).cloned()))
    }

    async fn list_friends(&self, owner: &str) -> Result<Vec<FriendLink>, AppError> {
        self.enter("list_friends")?;
        Ok(self
            .inner
            .friends
            .get(owner)
            .map(|links| links.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn delete_friend_link(&self, owner: &str, friend_id: &str) -> Result<(), AppError> {
        self.enter("delete_friend_link")?;
        if let Some(mut links) = self.inner.friends.get_mut(owner) {
            links.remove(friend_id);
        }
        Ok(())
    }

    async fn add_notification(
        &self,
        uid: &str,
        notification: &Notification,
    ) -> Result<String, AppError> {
        self.enter("add_notification")?;
        let id = self.auto_id();
        let mut stored = notification.clone();
        stored.id = id.clone();
        stored.created_at = Some(Utc::now());
        self.inner
            .notifications
            .entry(uid.to_string())
            .or_default()
            .push(stored);
        Ok(id)
    }

    async fn list_notifications(&self, uid: &str) -> Result<Vec<Notification>, AppError> {
        self.enter("list_notifications")?;
        let mut items = self
            .inner
            .notifications
            .get(uid)
            .map(|n| n.clone())
            .unwrap_or_default();
        newest_first(&mut items, |n| n.created_at);
        Ok(items)
    }

    async fn mark_notification_read(&self, uid: &str, id: &str) -> Result<(), AppError> {
        self.enter("mark_notification_read")?;
        let mut items = self.inner.notifications.get_mut(uid).ok_or_else(|| {
            AppError::NotFound(format!("No document to update: notification {}", id))
        })?;
        let item = items
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| AppError::NotFound(format!("No document to update: notification {}", id)))?;
        item.read = true;
        Ok(())
    }
}
