use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

use simba_core::aggregate::MoodWindow;
use simba_core::domain::mood::{DailyMood, Mood, MoodId, ThreadKey};
use simba_core::domain::user::{NewUser, SlackUserId, User, UserId, UserWithMoods};

pub mod mood;
pub mod user;

pub use mood::SqlMoodRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns the row for `new_user.slack_user_id`, creating it on first sight.
    /// Later calls never rewrite the stored name or channel.
    async fn find_or_create(&self, new_user: &NewUser) -> Result<User, RepositoryError>;

    async fn find_by_slack_id(&self, id: &SlackUserId) -> Result<Option<User>, RepositoryError>;

    async fn set_manager(
        &self,
        id: &SlackUserId,
        is_manager: bool,
    ) -> Result<Option<User>, RepositoryError>;

    /// Every user with the moods that fall inside `window`, newest first and
    /// capped at `window.limit_per_user` entries each.
    async fn list_with_moods_in_window(
        &self,
        window: &MoodWindow,
    ) -> Result<Vec<UserWithMoods>, RepositoryError>;
}

#[async_trait]
pub trait MoodRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] when the user already answered the thread.
    async fn create(
        &self,
        user_id: UserId,
        mood: Mood,
        thread: &ThreadKey,
    ) -> Result<DailyMood, RepositoryError>;

    async fn find_by_id(&self, id: MoodId) -> Result<Option<DailyMood>, RepositoryError>;

    async fn find_by_thread(
        &self,
        thread: &ThreadKey,
        user_id: UserId,
    ) -> Result<Option<DailyMood>, RepositoryError>;

    /// Partial update: a `None` field leaves its column untouched.
    async fn update_fields(
        &self,
        id: MoodId,
        feeling: Option<&str>,
        context: Option<&str>,
    ) -> Result<Option<DailyMood>, RepositoryError>;

    async fn delete(&self, id: MoodId) -> Result<bool, RepositoryError>;

    /// Deletes whatever the user recorded for `thread` and inserts a fresh
    /// entry, in one transaction.
    async fn replace(
        &self,
        user_id: UserId,
        mood: Mood,
        thread: &ThreadKey,
    ) -> Result<DailyMood, RepositoryError>;

    async fn list_recent_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DailyMood>, RepositoryError>;

    async fn latest_with_mood(&self, mood: Mood)
        -> Result<Option<(User, DailyMood)>, RepositoryError>;
}

/// Fixed-width UTC timestamps keep lexical order equal to chronological order.
pub(crate) fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_mood(column: &str, value: String) -> Result<Mood, RepositoryError> {
    value
        .parse::<Mood>()
        .map_err(|error| RepositoryError::Decode(format!("invalid value in `{column}`: {error}")))
}

pub(crate) fn map_unique_violation(error: sqlx::Error, what: impl Into<String>) -> RepositoryError {
    match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            RepositoryError::Conflict(what.into())
        }
        _ => RepositoryError::Database(error),
    }
}
