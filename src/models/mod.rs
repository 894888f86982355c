// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod fall;
pub mod identity;
pub mod notification;
pub mod social;
pub mod user;

pub use fall::{FallEvent, NotableFall};
pub use identity::{AuthErrorCode, Identity};
pub use notification::Notification;
pub use social::{FriendLink, FriendRequest};
pub use user::{
    ProfileFields, ProfileRefresh, ProfileStats, StatMetric, StatsDelta, TagReservation,
    UserProfile,
};
