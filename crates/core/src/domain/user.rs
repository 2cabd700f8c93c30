use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::mood::DailyMood;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Slack member id (`U…`), the external identity of a user.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlackUserId(pub String);

impl SlackUserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SlackUserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub slack_user_id: SlackUserId,
    pub username: String,
    pub slack_channel_id: String,
    pub is_manager: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for the lazy find-or-create of a user on first interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewUser {
    pub slack_user_id: SlackUserId,
    pub username: String,
    pub slack_channel_id: String,
}

/// A user together with the moods selected by an aggregation window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserWithMoods {
    pub user: User,
    pub moods: Vec<DailyMood>,
}

/// Name shown for a user when the Slack profile has neither a display name nor a real name.
pub const FALLBACK_DISPLAY_NAME: &str = "John Snow";

pub fn resolve_display_name(display_name: Option<&str>, real_name: Option<&str>) -> String {
    [display_name, real_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .unwrap_or(FALLBACK_DISPLAY_NAME)
        .to_string()
}
