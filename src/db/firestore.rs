// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (`users/{uid}`) and tag reservations (`userTags/{tag}`)
//! - Falls and notable falls (per-user subcollections)
//! - Friend requests and mirrored friend links
//! - Notifications

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};

use crate::db::{collections, DocumentStore};
use crate::error::AppError;
use crate::models::{
    FallEvent, FriendLink, FriendRequest, NotableFall, Notification, ProfileFields,
    ProfileRefresh, ProfileStats, StatMetric, StatsDelta, TagReservation, UserProfile,
};

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

/// Partial profile written on sign-in; absent options are left untouched.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileRefreshDoc {
    display_name: String,
    email: Option<String>,
    #[serde(rename = "photoURL")]
    photo_url: Option<String>,
    private: bool,
    #[serde(with = "firestore::serialize_as_timestamp")]
    last_login_at: DateTime<Utc>,
    #[serde(rename = "userTag", skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<ProfileStats>,
}

#[derive(Serialize, Deserialize)]
struct TagDoc {
    #[serde(rename = "userTag")]
    tag: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DisplayNameDoc {
    display_name: String,
}

#[derive(Serialize, Deserialize)]
struct ReadDoc {
    read: bool,
}

fn db_err(e: impl std::fmt::Display) -> AppError {
    AppError::Database(e.to_string())
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Path of `users/{uid}`, the parent of every per-user subcollection.
    fn user_path(&self, uid: &str) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::USERS, uid)
            .map_err(db_err)
    }

    /// Insert into a per-user subcollection with a generated ID.
    async fn add_to_subcollection<T>(
        &self,
        uid: &str,
        collection: &str,
        object: &T,
    ) -> Result<String, AppError>
    where
        T: Serialize + for<'de> Deserialize<'de> + Sync + Send,
    {
        let parent = self.user_path(uid)?;
        let created: IdOnly = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .generate_document_id()
            .parent(&parent)
            .object(object)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(created.id)
    }
}

/// Deserialization target that keeps only the generated document ID.
#[derive(serde::Deserialize)]
struct IdOnly {
    #[serde(alias = "_firestore_id")]
    id: String,
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    // ─── Profile Operations ──────────────────────────────────────

    async fn get_profile(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(uid)
            .await
            .map_err(db_err)
    }

    async fn create_profile(&self, uid: &str, fields: &ProfileFields) -> Result<(), AppError> {
        let now = Utc::now();
        let profile = UserProfile {
            id: uid.to_string(),
            display_name: fields.display_name.clone(),
            email: fields.email.clone(),
            photo_url: fields.photo_url.clone(),
            tag: None,
            stats: Some(ProfileStats::default()),
            private: fields.private,
            created_at: Some(now),
            last_login_at: Some(now),
        };

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(uid)
            .object(&profile)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn refresh_profile(
        &self,
        uid: &str,
        refresh: &ProfileRefresh,
    ) -> Result<(), AppError> {
        let doc = ProfileRefreshDoc {
            display_name: refresh.fields.display_name.clone(),
            email: refresh.fields.email.clone(),
            photo_url: refresh.fields.photo_url.clone(),
            private: refresh.fields.private,
            last_login_at: Utc::now(),
            tag: refresh.tag.clone(),
            stats: refresh.stats.clone(),
        };

        let mut mask = vec!["displayName", "email", "photoURL", "private", "lastLoginAt"];
        if doc.tag.is_some() {
            mask.push("userTag");
        }
        if doc.stats.is_some() {
            mask.push("stats");
        }

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(mask)
            .in_col(collections::USERS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .object(&doc)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_profile_tag(&self, uid: &str, tag: &str) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["userTag"])
            .in_col(collections::USERS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .object(&TagDoc {
                tag: tag.to_string(),
            })
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_display_name(&self, uid: &str, name: &str) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["displayName"])
            .in_col(collections::USERS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .object(&DisplayNameDoc {
                display_name: name.to_string(),
            })
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_profiles_by_tag(&self, tag: &str) -> Result<Vec<UserProfile>, AppError> {
        let tag = tag.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .filter(move |q| q.for_all([q.field("userTag").eq(tag.clone())]))
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn top_profiles(
        &self,
        metric: StatMetric,
        limit: u32,
    ) -> Result<Vec<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .order_by([(
                metric.field_path(),
                firestore::FirestoreQueryDirection::Descending,
            )])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn increment_stats(&self, uid: &str, delta: &StatsDelta) -> Result<(), AppError> {
        if delta.is_empty() {
            return Ok(());
        }

        // Transform-only writes are only accepted as part of a commit
        let client = self.get_client()?;
        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(uid)
            .transforms(|t| {
                t.fields([
                    (delta.drops != 0).then(|| t.field("stats.totalDrops").increment(delta.drops)),
                    (delta.distance != 0.0)
                        .then(|| t.field("stats.totalDistance").increment(delta.distance)),
                    (delta.bounces != 0)
                        .then(|| t.field("stats.totalBounces").increment(delta.bounces)),
                    (delta.friends != 0).then(|| t.field("stats.friends").increment(delta.friends)),
                ]
                .into_iter()
                .flatten())
            })
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add stats increment to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Stats increment commit failed: {}", e)))?;
        Ok(())
    }

    // ─── Tag Reservations ────────────────────────────────────────

    /// Read-then-create-if-absent inside a Firestore transaction.
    ///
    /// A concurrent reservation of the same tag invalidates the read and the
    /// transaction is retried, which then observes the existing document.
    async fn reserve_tag(&self, tag: &str) -> Result<bool, AppError> {
        let tag = tag.to_string();
        self.get_client()?
            .run_transaction(|db, transaction| {
                let tag = tag.clone();
                async move {
                    let existing: Option<TagReservation> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_TAGS)
                        .obj()
                        .one(&tag)
                        .await?;

                    if existing.is_some() {
                        return Ok(false);
                    }

                    let reservation = TagReservation {
                        reserved: true,
                        created_at: Some(Utc::now()),
                    };

                    db.fluent()
                        .update()
                        .in_col(collections::USER_TAGS)
                        .document_id(&tag)
                        .object(&reservation)
                        .add_to_transaction(transaction)?;

                    Ok(true)
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Tag reservation failed: {}", e)))
    }

    // ─── Fall Operations ─────────────────────────────────────────

    async fn add_fall(&self, uid: &str, fall: &FallEvent) -> Result<String, AppError> {
        let mut fall = fall.clone();
        fall.created_at = Some(Utc::now());
        self.add_to_subcollection(uid, collections::FALLS, &fall)
            .await
    }

    async fn list_falls(
        &self,
        uid: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<FallEvent>, AppError> {
        let parent = self.user_path(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FALLS)
            .parent(&parent)
            .filter(move |q| {
                q.for_all([since.and_then(|since| {
                    q.field("createdAt")
                        .greater_than_or_equal(firestore::FirestoreTimestamp(since))
                })])
            })
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Ascending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn add_notable_fall(&self, uid: &str, fall: &NotableFall) -> Result<String, AppError> {
        let mut fall = fall.clone();
        fall.created_at = Some(Utc::now());
        self.add_to_subcollection(uid, collections::NOTABLE_FALLS, &fall)
            .await
    }

    async fn list_notable_falls(&self, uid: &str) -> Result<Vec<NotableFall>, AppError> {
        let parent = self.user_path(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTABLE_FALLS)
            .parent(&parent)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    // ─── Friend Graph Operations ─────────────────────────────────

    async fn add_friend_request(
        &self,
        recipient: &str,
        request: &FriendRequest,
    ) -> Result<String, AppError> {
        let mut request = request.clone();
        request.created_at = Some(Utc::now());
        self.add_to_subcollection(recipient, collections::FRIEND_REQUESTS, &request)
            .await
    }

    async fn get_friend_request(
        &self,
        recipient: &str,
        request_id: &str,
    ) -> Result<Option<FriendRequest>, AppError> {
        let parent = self.user_path(recipient)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FRIEND_REQUESTS)
            .parent(&parent)
            .obj()
            .one(request_id)
            .await
            .map_err(db_err)
    }

    async fn list_friend_requests(
        &self,
        recipient: &str,
    ) -> Result<Vec<FriendRequest>, AppError> {
        let parent = self.user_path(recipient)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FRIEND_REQUESTS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn delete_friend_request(
        &self,
        recipient: &str,
        request_id: &str,
    ) -> Result<(), AppError> {
        let parent = self.user_path(recipient)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FRIEND_REQUESTS)
            .parent(&parent)
            .document_id(request_id)
            .execute()
            .await
            .map_err(db_err)
    }

    async fn set_friend_link(&self, owner: &str, link: &FriendLink) -> Result<(), AppError> {
        let parent = self.user_path(owner)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::FRIENDS)
            .document_id(&link.friend_id)
            .parent(&parent)
            .object(link)
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_friend_link(
        &self,
        owner: &str,
        friend_id: &str,
    ) -> Result<Option<FriendLink>, AppError> {
        let parent = self.user_path(owner)?;
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::FRIENDS)
            .parent(&parent)
            .obj()
            .one(friend_id)
            .await
            .map_err(db_err)
    }

    async fn list_friends(&self, owner: &str) -> Result<Vec<FriendLink>, AppError> {
        let parent = self.user_path(owner)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::FRIENDS)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn delete_friend_link(&self, owner: &str, friend_id: &str) -> Result<(), AppError> {
        let parent = self.user_path(owner)?;
        self.get_client()?
            .fluent()
            .delete()
            .from(collections::FRIENDS)
            .parent(&parent)
            .document_id(friend_id)
            .execute()
            .await
            .map_err(db_err)
    }

    // ─── Notification Operations ─────────────────────────────────

    async fn add_notification(
        &self,
        uid: &str,
        notification: &Notification,
    ) -> Result<String, AppError> {
        let mut notification = notification.clone();
        notification.created_at = Some(Utc::now());
        self.add_to_subcollection(uid, collections::NOTIFICATIONS, &notification)
            .await
    }

    async fn list_notifications(&self, uid: &str) -> Result<Vec<Notification>, AppError> {
        let parent = self.user_path(uid)?;
        self.get_client()?
            .fluent()
            .select()
            .from(collections::NOTIFICATIONS)
            .parent(&parent)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(db_err)
    }

    async fn mark_notification_read(&self, uid: &str, id: &str) -> Result<(), AppError> {
        let parent = self.user_path(uid)?;
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .fields(["read"])
            .in_col(collections::NOTIFICATIONS)
            .precondition(firestore::FirestoreWritePrecondition::Exists(true))
            .document_id(id)
            .parent(&parent)
            .object(&ReadDoc { read: true })
            .execute()
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
