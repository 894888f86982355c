// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-side aggregation: chart buckets, fall counts, leaderboards.
//!
//! Everything here is recomputed from current documents on each request.
//! Calendar bucketing uses UTC dates.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::DocumentStore;
use crate::error::{AppError, Result};
use crate::models::{FallEvent, NotableFall, Notification, StatMetric, UserProfile};

/// Size of the global leaderboard.
pub const GLOBAL_LEADERBOARD_SIZE: u32 = 10;

/// Suffix appended to the caller's own row on the friends leaderboard.
pub const SELF_SUFFIX: &str = " (You)";

/// Calendar bucket size for the fall chart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grouping {
    Daily,
    Weekly,
    #[default]
    Monthly,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(feature = "binding-generation", ts(export))]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// Look-back window for the home-page counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Weeks(u32),
    Months(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(ts_rs::TS))]
#[cfg_attr(feature = "binding-generation", ts(export))]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub uid: String,
    pub name: String,
    pub tag: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub value: f64,
}

fn fall_value(fall: &FallEvent, metric: StatMetric) -> f64 {
    match metric {
        StatMetric::Drops => 1.0,
        StatMetric::Distance => fall.height,
        StatMetric::Bounces => fall.bounces as f64,
    }
}

/// `Week N` as numbered by the chart: week 1 is the (Sunday-started) week
/// containing January 1st.
pub fn week_of_year(date: NaiveDate) -> u32 {
    let jan1_weekday = NaiveDate::from_ymd_opt(date.year(), 1, 1)
        .map(|d| d.weekday().num_days_from_sunday())
        .unwrap_or(0);
    let day0 = date.ordinal0();
    (day0 + jan1_weekday + 1).div_ceil(7)
}

fn bucket_label(at: DateTime<Utc>, grouping: Grouping) -> String {
    match grouping {
        Grouping::Daily => at.format("%Y-%m-%d").to_string(),
        Grouping::Weekly => format!("Week {}", week_of_year(at.date_naive())),
        Grouping::Monthly => at.format("%b").to_string(),
    }
}

/// Sum `metric` per calendar bucket for falls in `year`.
///
/// Buckets appear in the order their first fall occurred. Falls still
/// missing a server timestamp are skipped.
pub fn chart_series(
    falls: &[FallEvent],
    metric: StatMetric,
    year: i32,
    grouping: Grouping,
) -> Vec<ChartPoint> {
    let mut dated: Vec<(DateTime<Utc>, &FallEvent)> = falls
        .iter()
        .filter_map(|f| f.created_at.map(|at| (at, f)))
        .filter(|(at, _)| at.year() == year)
        .collect();
    dated.sort_by_key(|(at, _)| *at);

    let mut points: Vec<ChartPoint> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (at, fall) in dated {
        let label = bucket_label(at, grouping);
        let value = fall_value(fall, metric);
        match index.get(&label) {
            Some(&i) => points[i].value += value,
            None => {
                index.insert(label.clone(), points.len());
                points.push(ChartPoint { label, value });
            }
        }
    }

    points
}

/// Years with at least one fall, ascending; the current year when empty.
pub fn available_years(falls: &[FallEvent], now: DateTime<Utc>) -> Vec<i32> {
    let years: BTreeSet<i32> = falls
        .iter()
        .filter_map(|f| f.created_at)
        .map(|at| at.year())
        .collect();

    if years.is_empty() {
        vec![now.year()]
    } else {
        years.into_iter().collect()
    }
}

/// `YYYY-MM` keys with at least one fall, newest first.
pub fn available_months(falls: &[FallEvent]) -> Vec<String> {
    let months: BTreeSet<String> = falls
        .iter()
        .filter_map(|f| f.created_at)
        .map(|at| at.format("%Y-%m").to_string())
        .collect();
    months.into_iter().rev().collect()
}

/// Falls created at or after `now` minus `period`.
///
/// A window reaching past the representable calendar counts every fall.
pub fn count_falls_in_window(falls: &[FallEvent], now: DateTime<Utc>, period: Period) -> usize {
    let start = match period {
        Period::Weeks(n) => chrono::TimeDelta::try_weeks(i64::from(n))
            .and_then(|span| now.checked_sub_signed(span)),
        Period::Months(n) => now.checked_sub_months(Months::new(n)),
    };

    falls
        .iter()
        .filter_map(|f| f.created_at)
        .filter(|at| start.map_or(true, |start| *at >= start))
        .count()
}

/// Falls created in calendar `month` (1-12) of `year`.
pub fn count_falls_in_month(falls: &[FallEvent], year: i32, month: u32) -> usize {
    falls
        .iter()
        .filter_map(|f| f.created_at)
        .filter(|at| at.year() == year && at.month() == month)
        .count()
}

/// Sort profiles by `metric`, highest first, ties broken by name.
pub fn rank_leaderboard(profiles: Vec<UserProfile>, metric: StatMetric) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = profiles
        .into_iter()
        .map(|p| LeaderboardEntry {
            rank: 0,
            value: metric.value_of(&p.stats_or_default()),
            uid: p.id,
            name: p.display_name,
            tag: p.tag,
            photo_url: p.photo_url,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.name.cmp(&b.name))
    });
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    entries
}

/// Document-backed loaders for the read-side pages.
#[derive(Clone)]
pub struct ViewService {
    store: Arc<dyn DocumentStore>,
}

impl ViewService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn falls(&self, uid: &str) -> Result<Vec<FallEvent>> {
        self.store.list_falls(uid, None).await
    }

    pub async fn chart(
        &self,
        uid: &str,
        metric: StatMetric,
        year: i32,
        grouping: Grouping,
    ) -> Result<Vec<ChartPoint>> {
        let falls = self.store.list_falls(uid, None).await?;
        Ok(chart_series(&falls, metric, year, grouping))
    }

    pub async fn count_in_window(&self, uid: &str, now: DateTime<Utc>, period: Period) -> Result<usize> {
        let falls = self.store.list_falls(uid, None).await?;
        Ok(count_falls_in_window(&falls, now, period))
    }

    pub async fn count_in_month(&self, uid: &str, year: i32, month: u32) -> Result<usize> {
        if !(1..=12).contains(&month) {
            return Err(AppError::BadRequest(format!("Invalid month {}", month)));
        }
        let falls = self.store.list_falls(uid, None).await?;
        Ok(count_falls_in_month(&falls, year, month))
    }

    /// Newest first.
    pub async fn notable_falls(&self, uid: &str) -> Result<Vec<NotableFall>> {
        let mut notable = self.store.list_notable_falls(uid).await?;
        notable.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notable)
    }

    /// Newest first.
    pub async fn notifications(&self, uid: &str) -> Result<Vec<Notification>> {
        let mut notifications = self.store.list_notifications(uid).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    pub async fn global_leaderboard(&self, metric: StatMetric) -> Result<Vec<LeaderboardEntry>> {
        let top = self
            .store
            .top_profiles(metric, GLOBAL_LEADERBOARD_SIZE)
            .await?;
        Ok(rank_leaderboard(top, metric))
    }

    /// The caller plus every friend whose profile still exists.
    pub async fn friends_leaderboard(
        &self,
        uid: &str,
        metric: StatMetric,
    ) -> Result<Vec<LeaderboardEntry>> {
        let mut profiles = Vec::new();

        if let Some(mut me) = self.store.get_profile(uid).await? {
            me.display_name.push_str(SELF_SUFFIX);
            profiles.push(me);
        }

        for link in self.store.list_friends(uid).await? {
            match self.store.get_profile(&link.friend_id).await? {
                Some(friend) => profiles.push(friend),
                None => tracing::debug!(uid, friend_id = %link.friend_id, "Skipping missing friend profile"),
            }
        }

        Ok(rank_leaderboard(profiles, metric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fall_at(y: i32, m: u32, d: u32, height: f64, bounces: u32) -> FallEvent {
        FallEvent {
            id: String::new(),
            height,
            bounces,
            created_at: Some(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()),
            notable: false,
        }
    }

    #[test]
    fn week_one_contains_january_first() {
        // 2026-01-01 is a Thursday
        let jan1 = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        assert_eq!(week_of_year(jan1), 1);
        // Saturday 2026-01-03 closes week 1, Sunday opens week 2
        assert_eq!(week_of_year(NaiveDate::from_ymd_opt(2026, 1, 3).unwrap()), 1);
        assert_eq!(week_of_year(NaiveDate::from_ymd_opt(2026, 1, 4).unwrap()), 2);
    }

    #[test]
    fn monthly_distance_buckets_in_first_seen_order() {
        let falls = vec![
            fall_at(2026, 3, 2, 1.5, 0),
            fall_at(2026, 1, 10, 2.0, 1),
            fall_at(2026, 1, 20, 0.5, 2),
            fall_at(2025, 12, 31, 9.0, 0),
        ];

        let series = chart_series(&falls, StatMetric::Distance, 2026, Grouping::Monthly);
        assert_eq!(
            series,
            vec![
                ChartPoint {
                    label: "Jan".to_string(),
                    value: 2.5
                },
                ChartPoint {
                    label: "Mar".to_string(),
                    value: 1.5
                },
            ]
        );
    }

    #[test]
    fn drops_metric_counts_falls_per_day() {
        let falls = vec![
            fall_at(2026, 5, 1, 1.0, 3),
            fall_at(2026, 5, 1, 1.0, 3),
            fall_at(2026, 5, 2, 1.0, 3),
        ];
        let series = chart_series(&falls, StatMetric::Drops, 2026, Grouping::Daily);
        assert_eq!(series[0].label, "2026-05-01");
        assert_eq!(series[0].value, 2.0);
        assert_eq!(series[1].value, 1.0);
    }

    #[test]
    fn years_and_months_selectors() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        assert_eq!(available_years(&[], now), vec![2026]);

        let falls = vec![
            fall_at(2025, 2, 1, 1.0, 0),
            fall_at(2026, 7, 1, 1.0, 0),
            fall_at(2025, 11, 1, 1.0, 0),
        ];
        assert_eq!(available_years(&falls, now), vec![2025, 2026]);
        assert_eq!(
            available_months(&falls),
            vec!["2026-07", "2025-11", "2025-02"]
        );
    }

    #[test]
    fn window_and_month_counts() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let falls = vec![
            fall_at(2026, 10, 15, 1.0, 0),
            fall_at(2026, 10, 1, 1.0, 0),
            fall_at(2026, 8, 30, 1.0, 0),
        ];

        assert_eq!(count_falls_in_window(&falls, now, Period::Weeks(1)), 1);
        assert_eq!(count_falls_in_window(&falls, now, Period::Months(1)), 2);
        assert_eq!(count_falls_in_window(&falls, now, Period::Months(3)), 3);
        assert_eq!(count_falls_in_month(&falls, 2026, 10), 2);
        assert_eq!(count_falls_in_month(&falls, 2026, 9), 0);
    }

    #[test]
    fn window_past_calendar_range_counts_everything() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap();
        let falls = vec![fall_at(1999, 1, 1, 1.0, 0), fall_at(2026, 10, 1, 1.0, 0)];

        assert_eq!(count_falls_in_window(&falls, now, Period::Weeks(u32::MAX)), 2);
        assert_eq!(count_falls_in_window(&falls, now, Period::Months(u32::MAX)), 2);
    }

    #[test]
    fn leaderboard_sorts_descending_with_name_tiebreak() {
        let profile = |id: &str, name: &str, distance: f64| {
            let mut p: UserProfile = serde_json::from_value(serde_json::json!({
                "displayName": name,
                "stats": { "totalDistance": distance }
            }))
            .unwrap();
            p.id = id.to_string();
            p
        };

        let ranked = rank_leaderboard(
            vec![
                profile("c", "Cleo", 1.0),
                profile("b", "Bo", 3.0),
                profile("a", "Al", 3.0),
            ],
            StatMetric::Distance,
        );

        let order: Vec<_> = ranked.iter().map(|e| (e.rank, e.name.as_str())).collect();
        assert_eq!(order, vec![(1, "Al"), (2, "Bo"), (3, "Cleo")]);
    }
}
