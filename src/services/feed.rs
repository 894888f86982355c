// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live change notifications for the read-side views.
//!
//! Producers publish after each successful write; views re-fetch whatever
//! they render when a matching event arrives. Delivery is best-effort: a
//! slow subscriber that lags behind simply misses events and catches up on
//! the next one, since every re-render reads current state.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::models::Notification;

const FEED_CAPACITY: usize = 256;

/// Delay before a native notification fires.
pub const NATIVE_NOTIFICATION_DELAY: Duration = Duration::from_millis(300);

/// What changed for a user.
#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    ProfileChanged,
    FallsChanged,
    FriendsChanged,
    RequestsChanged,
    NotificationAdded(Notification),
}

impl UserEvent {
    /// Event name used on the SSE stream.
    pub fn name(&self) -> &'static str {
        match self {
            UserEvent::ProfileChanged => "profile",
            UserEvent::FallsChanged => "falls",
            UserEvent::FriendsChanged => "friends",
            UserEvent::RequestsChanged => "requests",
            UserEvent::NotificationAdded(_) => "notification",
        }
    }
}

/// Fire-once notification on the device, when running inside a native shell.
pub trait NativeNotifier: Send + Sync {
    fn schedule(&self, title: &str, body: &str, delay: Duration);
}

/// Fan-out of per-user change events.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<(String, UserEvent)>,
    native: Option<Arc<dyn NativeNotifier>>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx, native: None }
    }

    /// Forward new unread notifications to a native notifier.
    pub fn with_native_notifier(mut self, notifier: Arc<dyn NativeNotifier>) -> Self {
        self.native = Some(notifier);
        self
    }

    /// Publish an event for `uid`. No subscribers is not an error.
    pub fn publish(&self, uid: &str, event: UserEvent) {
        if let (Some(native), UserEvent::NotificationAdded(n)) = (&self.native, &event) {
            if !n.read {
                native.schedule(&n.title, &n.body, NATIVE_NOTIFICATION_DELAY);
            }
        }
        let _ = self.tx.send((uid.to_string(), event));
    }

    /// Subscribe to events for one user.
    pub fn subscribe(&self, uid: &str) -> UserSubscription {
        UserSubscription {
            uid: uid.to_string(),
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiver filtered down to one user's events.
pub struct UserSubscription {
    uid: String,
    rx: broadcast::Receiver<(String, UserEvent)>,
}

impl UserSubscription {
    /// Next event for this user, or `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<UserEvent> {
        loop {
            match self.rx.recv().await {
                Ok((uid, event)) if uid == self.uid => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(uid = %self.uid, skipped, "Change feed subscriber lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
