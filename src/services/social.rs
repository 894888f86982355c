// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Social graph manager: friend codes, requests, mirrored links, reminders.
//!
//! Friendships are stored twice, once under each side. Accepting a request
//! is a sequence of independent writes (both links, request delete, inbox
//! item, both counters); a failure partway is logged and returned, leaving
//! whatever already succeeded in place.

use chrono::Utc;
use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{FriendLink, FriendRequest, Notification, StatsDelta, UserProfile};
use crate::services::feed::{ChangeFeed, UserEvent};
use crate::services::tags::normalize_tag_query;

#[derive(Clone)]
pub struct SocialGraph {
    store: Arc<dyn DocumentStore>,
    feed: ChangeFeed,
}

impl SocialGraph {
    pub fn new(store: Arc<dyn DocumentStore>, feed: ChangeFeed) -> Self {
        Self { store, feed }
    }

    /// Exact-match friend-code lookup, excluding the caller.
    pub async fn search_by_tag(&self, uid: &str, raw_tag: &str) -> Result<Vec<UserProfile>> {
        let tag = normalize_tag_query(raw_tag)?;
        let profiles = self.store.find_profiles_by_tag(&tag).await?;

        Ok(profiles.into_iter().filter(|p| p.id != uid).collect())
    }

    /// Invite `target` using the sender's cached display data.
    pub async fn send_friend_request(&self, uid: &str, target: &str) -> Result<FriendRequest> {
        if uid == target {
            return Err(AppError::BadRequest(
                "You cannot add yourself as a friend.".to_string(),
            ));
        }

        let sender = self
            .store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        if self.store.get_profile(target).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", target)));
        }

        let mut request = FriendRequest::from_sender(&sender);
        request.id = self.store.add_friend_request(target, &request).await?;
        tracing::info!(from = uid, to = target, request_id = %request.id, "Friend request sent");

        self.feed.publish(target, UserEvent::RequestsChanged);
        Ok(request)
    }

    pub async fn list_friend_requests(&self, uid: &str) -> Result<Vec<FriendRequest>> {
        self.store.list_friend_requests(uid).await
    }

    pub async fn list_friends(&self, uid: &str) -> Result<Vec<FriendLink>> {
        self.store.list_friends(uid).await
    }

    /// Accept a pending request addressed to `uid`.
    pub async fn accept_friend_request(&self, uid: &str, request_id: &str) -> Result<FriendLink> {
        let request = self.pending_request(uid, request_id).await?;
        let me = self
            .store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;
        let sender = request.from_uid.as_str();
        let since = Utc::now();

        let mine = FriendLink::to_sender(&request, since);
        self.store
            .set_friend_link(uid, &mine)
            .await
            .inspect_err(|e| tracing::error!(uid, sender, error = %e, "Failed to write own friend link"))?;

        self.store
            .set_friend_link(sender, &FriendLink::to_profile(&me, since))
            .await
            .inspect_err(|e| {
                tracing::error!(uid, sender, error = %e, "Failed to write mirrored friend link")
            })?;

        self.store
            .delete_friend_request(uid, request_id)
            .await
            .inspect_err(|e| tracing::error!(uid, request_id, error = %e, "Failed to delete friend request"))?;

        let mut notification = Notification::friend_request_accepted(&me.display_name);
        notification.id = self
            .store
            .add_notification(sender, &notification)
            .await
            .inspect_err(|e| tracing::error!(uid, sender, error = %e, "Failed to notify requester"))?;

        for owner in [uid, sender] {
            self.store
                .increment_stats(owner, &StatsDelta::new_friend())
                .await
                .inspect_err(|e| {
                    tracing::error!(owner, error = %e, "Failed to increment friend counter")
                })?;
        }

        tracing::info!(uid, sender, "Friend request accepted");

        self.feed.publish(uid, UserEvent::FriendsChanged);
        self.feed.publish(uid, UserEvent::RequestsChanged);
        self.feed.publish(uid, UserEvent::ProfileChanged);
        self.feed.publish(sender, UserEvent::FriendsChanged);
        self.feed.publish(sender, UserEvent::ProfileChanged);
        self.feed
            .publish(sender, UserEvent::NotificationAdded(notification));

        Ok(mine)
    }

    pub async fn decline_friend_request(&self, uid: &str, request_id: &str) -> Result<()> {
        self.pending_request(uid, request_id).await?;
        self.store.delete_friend_request(uid, request_id).await?;
        tracing::info!(uid, request_id, "Friend request declined");

        self.feed.publish(uid, UserEvent::RequestsChanged);
        Ok(())
    }

    /// Delete both halves of a friendship.
    ///
    /// Friend counters are left as they are.
    pub async fn remove_friend(&self, uid: &str, friend_id: &str) -> Result<()> {
        self.store.delete_friend_link(uid, friend_id).await?;
        self.store
            .delete_friend_link(friend_id, uid)
            .await
            .inspect_err(|e| {
                tracing::error!(uid, friend_id, error = %e, "Failed to delete mirrored friend link")
            })?;
        tracing::info!(uid, friend_id, "Friend removed");

        self.feed.publish(uid, UserEvent::FriendsChanged);
        self.feed.publish(friend_id, UserEvent::FriendsChanged);
        Ok(())
    }

    /// Drop a "be careful" note in a friend's inbox. Not rate limited.
    ///
    /// Only works for someone in the caller's friend list.
    pub async fn send_reminder(&self, uid: &str, friend_id: &str) -> Result<Notification> {
        if self.store.get_friend_link(uid, friend_id).await?.is_none() {
            tracing::warn!(from = uid, to = friend_id, "Reminder to non-friend refused");
            return Err(AppError::NotFound(format!("Friend {} not found", friend_id)));
        }

        let sender = self
            .store
            .get_profile(uid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", uid)))?;

        let mut notification = Notification::reminder(&sender.display_name);
        notification.id = self.store.add_notification(friend_id, &notification).await?;
        tracing::info!(from = uid, to = friend_id, "Reminder sent");

        self.feed
            .publish(friend_id, UserEvent::NotificationAdded(notification.clone()));
        Ok(notification)
    }

    async fn pending_request(&self, uid: &str, request_id: &str) -> Result<FriendRequest> {
        self.store
            .get_friend_request(uid, request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Friend request {} not found", request_id)))
    }
}
