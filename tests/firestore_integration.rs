// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore integration tests.
//!
//! These tests require the Firestore emulator to be running
//! (`FIRESTORE_EMULATOR_HOST` set); they are skipped otherwise.

use becareful::db::DocumentStore;
use becareful::models::{
    FallEvent, FriendLink, FriendRequest, Notification, ProfileFields, ProfileRefresh, StatsDelta,
};

mod common;
use common::{identity, test_db};

/// Generate a unique uid for test isolation.
fn unique_uid(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

// ═══════════════════════════════════════════════════════════════════════════
// PROFILE TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_profile_create_and_refresh() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("profile");

    assert!(db.get_profile(&uid).await.unwrap().is_none());

    let fields = ProfileFields::from_identity(&identity(&uid));
    db.create_profile(&uid, &fields).await.unwrap();

    let created = db.get_profile(&uid).await.unwrap().expect("profile exists");
    assert_eq!(created.display_name, fields.display_name);
    assert_eq!(created.tag, None);
    assert_eq!(created.stats_or_default().total_drops, 0);

    let mut renamed = fields.clone();
    renamed.display_name = "Renamed".to_string();
    db.refresh_profile(
        &uid,
        &ProfileRefresh {
            fields: renamed,
            tag: Some("#TEST01".to_string()),
            stats: None,
        },
    )
    .await
    .unwrap();

    let refreshed = db.get_profile(&uid).await.unwrap().unwrap();
    assert_eq!(refreshed.display_name, "Renamed");
    assert_eq!(refreshed.tag.as_deref(), Some("#TEST01"));
    assert_eq!(refreshed.created_at, created.created_at);
}

#[tokio::test]
async fn test_reserve_tag_only_once() {
    require_emulator!();

    let db = test_db().await;
    let tag = format!("#{}", &unique_uid("T")[2..8]);

    assert!(db.reserve_tag(&tag).await.unwrap());
    assert!(!db.reserve_tag(&tag).await.unwrap());
}

#[tokio::test]
async fn test_increment_stats_accumulates() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("stats");
    db.create_profile(&uid, &ProfileFields::from_identity(&identity(&uid)))
        .await
        .unwrap();

    db.increment_stats(&uid, &StatsDelta::fall(1.5, 2))
        .await
        .unwrap();
    db.increment_stats(&uid, &StatsDelta::fall(0.5, 0))
        .await
        .unwrap();
    db.increment_stats(&uid, &StatsDelta::new_friend())
        .await
        .unwrap();

    let stats = db.get_profile(&uid).await.unwrap().unwrap().stats_or_default();
    assert_eq!(stats.total_drops, 2);
    assert_eq!(stats.total_bounces, 2);
    assert_eq!(stats.friends, 1);
    assert!((stats.total_distance - 2.0).abs() < 1e-9);
}

// ═══════════════════════════════════════════════════════════════════════════
// SUBCOLLECTION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_falls_are_listed_oldest_first() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("falls");

    for height in [1.0, 2.0] {
        let fall = FallEvent {
            id: String::new(),
            height,
            bounces: 1,
            created_at: None,
            notable: false,
        };
        db.add_fall(&uid, &fall).await.unwrap();
    }

    let falls = db.list_falls(&uid, None).await.unwrap();
    assert_eq!(falls.len(), 2);
    assert_eq!(falls[0].height, 1.0);
    assert!(falls.iter().all(|f| f.created_at.is_some()));
}

#[tokio::test]
async fn test_friend_request_and_links() {
    require_emulator!();

    let db = test_db().await;
    let alice = unique_uid("alice");
    let bob = unique_uid("bob");
    db.create_profile(&alice, &ProfileFields::from_identity(&identity(&alice)))
        .await
        .unwrap();
    let sender = db.get_profile(&alice).await.unwrap().unwrap();

    let request_id = db
        .add_friend_request(&bob, &FriendRequest::from_sender(&sender))
        .await
        .unwrap();
    let request = db
        .get_friend_request(&bob, &request_id)
        .await
        .unwrap()
        .expect("request stored");
    assert_eq!(request.from_uid, alice);

    db.set_friend_link(&bob, &FriendLink::to_sender(&request, chrono::Utc::now()))
        .await
        .unwrap();
    db.delete_friend_request(&bob, &request_id).await.unwrap();

    assert!(db.list_friend_requests(&bob).await.unwrap().is_empty());
    let friends = db.list_friends(&bob).await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0].friend_id, alice);

    assert!(db.get_friend_link(&bob, &alice).await.unwrap().is_some());

    db.delete_friend_link(&bob, &alice).await.unwrap();
    assert!(db.list_friends(&bob).await.unwrap().is_empty());
    assert!(db.get_friend_link(&bob, &alice).await.unwrap().is_none());
}

#[tokio::test]
async fn test_notifications_mark_read() {
    require_emulator!();

    let db = test_db().await;
    let uid = unique_uid("inbox");

    let id = db
        .add_notification(&uid, &Notification::reminder("Bob"))
        .await
        .unwrap();
    db.mark_notification_read(&uid, &id).await.unwrap();

    let inbox = db.list_notifications(&uid).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(inbox[0].read);
}
