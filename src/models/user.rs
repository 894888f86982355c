//! User profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Display name used when the identity provider supplies none.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Profile document stored at `users/{uid}`.
///
/// Every field defaults on read: documents written by older clients may lack
/// `stats`, `userTag` or timestamps entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Identity ID (document ID, never stored as a field)
    #[serde(default, alias = "_firestore_id", skip_serializing)]
    pub id: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Unique friend code (`USER#NNNNLL`); `None` until reserved
    #[serde(default, rename = "userTag")]
    pub tag: Option<String>,
    /// Aggregate counters; `None` on documents that predate stats
    #[serde(default)]
    pub stats: Option<ProfileStats>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub last_login_at: Option<DateTime<Utc>>,
}

fn default_display_name() -> String {
    ANONYMOUS_NAME.to_string()
}

impl UserProfile {
    /// Stats with missing counters treated as zero.
    pub fn stats_or_default(&self) -> ProfileStats {
        self.stats.clone().unwrap_or_default()
    }
}

/// Aggregate counters embedded in the profile (`stats.*`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    #[serde(default)]
    pub total_drops: i64,
    /// Meters
    #[serde(default)]
    pub total_distance: f64,
    #[serde(default)]
    pub total_bounces: i64,
    #[serde(default)]
    pub friends: i64,
}

/// Fields refreshed from the identity on every sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileFields {
    pub display_name: String,
    pub email: Option<String>,
    pub photo_url: Option<String>,
    pub private: bool,
}

impl ProfileFields {
    pub fn from_identity(identity: &crate::models::Identity) -> Self {
        let display_name = identity
            .display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(ANONYMOUS_NAME)
            .to_string();

        Self {
            display_name,
            email: identity.email.clone(),
            photo_url: identity.photo_url.clone(),
            private: false,
        }
    }
}

/// Update applied to an existing profile on sign-in.
///
/// `tag` and `stats` are only set when the stored document lacks them.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRefresh {
    pub fields: ProfileFields,
    pub tag: Option<String>,
    pub stats: Option<ProfileStats>,
}

/// Field-level increments applied to `stats.*`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsDelta {
    pub drops: i64,
    pub distance: f64,
    pub bounces: i64,
    pub friends: i64,
}

impl StatsDelta {
    pub fn fall(distance: f64, bounces: u32) -> Self {
        Self {
            drops: 1,
            distance,
            bounces: bounces as i64,
            friends: 0,
        }
    }

    pub fn new_friend() -> Self {
        Self {
            friends: 1,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.drops == 0 && self.distance == 0.0 && self.bounces == 0 && self.friends == 0
    }
}

/// Uniqueness guard stored at `userTags/{tag}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagReservation {
    #[serde(default)]
    pub reserved: bool,
    #[serde(default, with = "firestore::serialize_as_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Metric a leaderboard or chart is ranked by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatMetric {
    #[default]
    Distance,
    Drops,
    Bounces,
}

impl StatMetric {
    /// Read this metric from a profile's stats.
    pub fn value_of(self, stats: &ProfileStats) -> f64 {
        match self {
            StatMetric::Distance => stats.total_distance,
            StatMetric::Drops => stats.total_drops as f64,
            StatMetric::Bounces => stats.total_bounces as f64,
        }
    }

    /// Document field path used for server-side ordering.
    pub fn field_path(self) -> &'static str {
        match self {
            StatMetric::Distance => "stats.totalDistance",
            StatMetric::Drops => "stats.totalDrops",
            StatMetric::Bounces => "stats.totalBounces",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    #[test]
    fn blank_display_name_falls_back_to_anonymous() {
        let identity = Identity {
            uid: "u1".to_string(),
            display_name: Some("   ".to_string()),
            email: None,
            photo_url: None,
        };
        assert_eq!(
            ProfileFields::from_identity(&identity).display_name,
            ANONYMOUS_NAME
        );
    }

    #[test]
    fn sparse_document_defaults_on_read() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "email": "a@example.com"
        }))
        .unwrap();

        assert_eq!(profile.display_name, ANONYMOUS_NAME);
        assert_eq!(profile.tag, None);
        assert_eq!(profile.stats_or_default(), ProfileStats::default());
        assert!(!profile.private);
    }

    #[test]
    fn stats_read_camel_case_fields() {
        let stats: ProfileStats = serde_json::from_value(serde_json::json!({
            "totalDrops": 3,
            "totalDistance": 4.5,
        }))
        .unwrap();

        assert_eq!(stats.total_drops, 3);
        assert_eq!(stats.total_distance, 4.5);
        assert_eq!(stats.total_bounces, 0);
        assert_eq!(StatMetric::Drops.value_of(&stats), 3.0);
    }
}
