// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile synchronization and tag allocation tests.

use becareful::db::{DocumentStore, MemoryStore};
use becareful::error::AppError;
use becareful::models::ProfileFields;
use becareful::services::tags::{allocate_unique_tag, is_valid_tag, MAX_TAG_ATTEMPTS};
use becareful::services::{
    ChangeFeed, ProfileSynchronizer, SessionBinder, SessionState, VerifiedCredential,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::sync::Arc;

mod common;
use common::{identity, now_secs};

fn synchronizer(store: &MemoryStore) -> ProfileSynchronizer {
    ProfileSynchronizer::new(Arc::new(store.clone()), ChangeFeed::new())
}

#[tokio::test]
async fn first_sign_in_creates_profile_with_tag_and_zeroed_stats() {
    let store = MemoryStore::new();
    let profiles = synchronizer(&store);

    let profile = profiles.ensure_profile(&identity("u1")).await.unwrap();

    let tag = profile.tag.clone().expect("tag assigned");
    assert!(is_valid_tag(&tag), "bad tag {}", tag);
    assert!(store.is_tag_reserved(&tag));
    assert_eq!(profile.stats, Some(Default::default()));
    assert_eq!(profile.display_name, "User u1");
    assert!(profile.created_at.is_some());
}

#[tokio::test]
async fn second_sign_in_keeps_tag_and_stats() {
    let store = MemoryStore::new();
    let profiles = synchronizer(&store);

    let first = profiles.ensure_profile(&identity("u1")).await.unwrap();
    store
        .increment_stats("u1", &becareful::models::StatsDelta::fall(2.0, 1))
        .await
        .unwrap();

    let mut renamed = identity("u1");
    renamed.display_name = Some("Renamed".to_string());
    let second = profiles.ensure_profile(&renamed).await.unwrap();

    assert_eq!(second.tag, first.tag);
    assert_eq!(second.display_name, "Renamed");
    assert_eq!(second.stats_or_default().total_drops, 1);
    assert_eq!(store.calls("create_profile"), 1);
    assert_eq!(store.calls("reserve_tag"), 1);
}

#[tokio::test]
async fn existing_profile_without_tag_is_backfilled() {
    let store = MemoryStore::new();
    store
        .create_profile("legacy", &ProfileFields::from_identity(&identity("legacy")))
        .await
        .unwrap();

    let profile = synchronizer(&store)
        .ensure_profile(&identity("legacy"))
        .await
        .unwrap();

    assert!(profile.tag.as_deref().is_some_and(is_valid_tag));
    assert_eq!(store.calls("create_profile"), 1);
}

#[tokio::test]
async fn exhausted_tag_space_fails_after_exactly_ten_attempts() {
    let store = MemoryStore::new();
    store.saturate_tags();

    let err = synchronizer(&store)
        .ensure_profile(&identity("unlucky"))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::TagSpaceExhausted(10)));
    assert_eq!(store.calls("reserve_tag"), u64::from(MAX_TAG_ATTEMPTS));

    // Phase one already happened; the next sign-in backfills the tag
    let stored = store.get_profile("unlucky").await.unwrap().unwrap();
    assert_eq!(stored.tag, None);
}

#[tokio::test]
async fn store_errors_during_reservation_count_as_collisions() {
    let store = MemoryStore::new();
    store.inject_fault("reserve_tag");
    let mut rng = StdRng::seed_from_u64(1);

    let err = allocate_unique_tag(&store, &mut rng).await.unwrap_err();
    assert!(matches!(err, AppError::TagSpaceExhausted(_)));
    assert_eq!(store.calls("reserve_tag"), 10);
}

#[tokio::test]
async fn allocated_tags_are_unique() {
    let store = MemoryStore::new();
    let mut rng = StdRng::seed_from_u64(42);

    let mut seen = HashSet::new();
    for _ in 0..200 {
        let tag = allocate_unique_tag(&store, &mut rng).await.unwrap();
        assert!(seen.insert(tag));
    }
}

#[tokio::test]
async fn concurrent_sign_ins_create_one_profile() {
    let store = MemoryStore::new();
    let binder = Arc::new(SessionBinder::new(synchronizer(&store), 300));
    let credential = VerifiedCredential {
        identity: identity("racer"),
        issued_at: now_secs(),
        auth_time: now_secs(),
    };

    let (a, b) = tokio::join!(binder.sign_in(&credential), binder.sign_in(&credential));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.tag, b.tag);
    assert_eq!(store.calls("create_profile"), 1);
    assert_eq!(store.calls("reserve_tag"), 1);
    // Lock released once both finished
    assert_eq!(binder.tracked_identities().1, 0);
}

#[tokio::test]
async fn sign_out_releases_unwatched_session_state() {
    let store = MemoryStore::new();
    let binder = SessionBinder::new(synchronizer(&store), 300);
    let credential = VerifiedCredential {
        identity: identity("u1"),
        issued_at: now_secs(),
        auth_time: now_secs(),
    };

    binder.sign_in(&credential).await.unwrap();
    assert_eq!(binder.tracked_identities(), (1, 0));

    // A live watcher keeps the channel
    let watcher = binder.subscribe("u1");
    binder.sign_out("u1");
    assert_eq!(binder.tracked_identities(), (1, 0));
    assert_eq!(*watcher.borrow(), SessionState::SignedOut);

    drop(watcher);
    binder.sign_out("u1");
    assert_eq!(binder.tracked_identities(), (0, 0));
}

#[tokio::test]
async fn stale_credential_is_rejected_before_any_write() {
    let store = MemoryStore::new();
    let binder = SessionBinder::new(synchronizer(&store), 300);
    let credential = VerifiedCredential {
        identity: identity("late"),
        issued_at: now_secs() - 301,
        auth_time: now_secs() - 301,
    };

    assert!(matches!(
        binder.sign_in(&credential).await,
        Err(AppError::StaleToken)
    ));
    assert_eq!(store.calls("get_profile"), 0);
}

#[tokio::test]
async fn display_name_updates_are_validated() {
    let store = MemoryStore::new();
    let profiles = synchronizer(&store);
    profiles.ensure_profile(&identity("u1")).await.unwrap();

    let updated = profiles.update_display_name("u1", "  Vera  ").await.unwrap();
    assert_eq!(updated.display_name, "Vera");

    assert!(profiles.update_display_name("u1", "   ").await.is_err());
    assert!(profiles
        .update_display_name("u1", &"x".repeat(51))
        .await
        .is_err());
}
