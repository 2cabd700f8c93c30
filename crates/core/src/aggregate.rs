//! Percentage rollups of mood entries for the home-tab dashboards.
//!
//! Results use ordered maps so rendering is stable across requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::mood::{DailyMood, Mood};
use crate::domain::user::UserWithMoods;

/// Most recent entries shown on an individual home tab.
pub const INDIVIDUAL_WINDOW_LIMIT: u32 = 7;
/// Most recent entries per user considered on the manager home tab.
pub const MANAGER_WINDOW_LIMIT: u32 = 14;
pub const MANAGER_WINDOW_DAYS: i64 = 14;

/// Time-bounded, per-user limited selection of mood entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MoodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit_per_user: u32,
}

impl MoodWindow {
    pub fn trailing_days(end: DateTime<Utc>, days: i64, limit_per_user: u32) -> Self {
        Self { start: end - Duration::days(days), end, limit_per_user }
    }

    pub fn manager(now: DateTime<Utc>) -> Self {
        Self::trailing_days(now, MANAGER_WINDOW_DAYS, MANAGER_WINDOW_LIMIT)
    }
}

pub fn count_by_category<'a, I>(moods: I) -> BTreeMap<Mood, usize>
where
    I: IntoIterator<Item = &'a DailyMood>,
{
    let mut counts = BTreeMap::new();
    for entry in moods {
        *counts.entry(entry.mood).or_insert(0) += 1;
    }
    counts
}

/// `100 * count / total` per key. A zero total yields an empty map.
pub fn percentages<K: Ord + Clone>(counts: &BTreeMap<K, usize>, total: usize) -> BTreeMap<K, f64> {
    if total == 0 {
        return BTreeMap::new();
    }

    counts
        .iter()
        .map(|(key, count)| (key.clone(), (*count as f64 / total as f64) * 100.0))
        .collect()
}

/// Percentages across every user's moods, denominated by the overall entry count.
pub fn global_breakdown(users: &[UserWithMoods]) -> BTreeMap<Mood, f64> {
    let counts = count_by_category(users.iter().flat_map(|entry| entry.moods.iter()));
    let total = users.iter().map(|entry| entry.moods.len()).sum();
    percentages(&counts, total)
}

/// Percentages per username, each denominated by that user's own entry count.
/// Users without entries in the window are left out.
pub fn per_user_breakdown(users: &[UserWithMoods]) -> BTreeMap<String, BTreeMap<Mood, f64>> {
    users
        .iter()
        .filter(|entry| !entry.moods.is_empty())
        .map(|entry| {
            let counts = count_by_category(&entry.moods);
            (entry.user.username.clone(), percentages(&counts, entry.moods.len()))
        })
        .collect()
}
