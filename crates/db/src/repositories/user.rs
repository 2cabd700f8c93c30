use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use simba_core::aggregate::MoodWindow;
use simba_core::domain::user::{NewUser, SlackUserId, User, UserId, UserWithMoods};

use super::mood::joined_mood_from_row;
use super::{
    format_timestamp, map_unique_violation, parse_timestamp, RepositoryError, UserRepository,
};
use crate::DbPool;

const USER_COLUMNS: &str = "id, slack_user_id, username, slack_channel_id, is_manager, created_at";

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_if_absent(
        &self,
        new_user: &NewUser,
        username: &str,
    ) -> Result<(), RepositoryError> {
        let now = format_timestamp(Utc::now());
        sqlx::query(
            "INSERT INTO users
                 (slack_user_id, username, slack_channel_id, is_manager, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?)
             ON CONFLICT(slack_user_id) DO NOTHING",
        )
        .bind(new_user.slack_user_id.as_str())
        .bind(username)
        .bind(&new_user.slack_channel_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_violation(error, format!("username `{username}` is taken")))?;

        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_or_create(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        if let Some(existing) = self.find_by_slack_id(&new_user.slack_user_id).await? {
            return Ok(existing);
        }

        match self.insert_if_absent(new_user, &new_user.username).await {
            Ok(()) => {}
            // Another member already uses this display name.
            Err(RepositoryError::Conflict(_)) => {
                let disambiguated = format!("{} ({})", new_user.username, new_user.slack_user_id);
                self.insert_if_absent(new_user, &disambiguated).await?;
            }
            Err(error) => return Err(error),
        }

        self.find_by_slack_id(&new_user.slack_user_id).await?.ok_or_else(|| {
            RepositoryError::Decode(format!(
                "user `{}` missing right after insert",
                new_user.slack_user_id
            ))
        })
    }

    async fn find_by_slack_id(&self, id: &SlackUserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE slack_user_id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_manager(
        &self,
        id: &SlackUserId,
        is_manager: bool,
    ) -> Result<Option<User>, RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET is_manager = ?, updated_at = ? WHERE slack_user_id = ?",
        )
        .bind(is_manager)
        .bind(format_timestamp(Utc::now()))
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_slack_id(id).await
    }

    async fn list_with_moods_in_window(
        &self,
        window: &MoodWindow,
    ) -> Result<Vec<UserWithMoods>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT
                u.id,
                u.slack_user_id,
                u.username,
                u.slack_channel_id,
                u.is_manager,
                u.created_at,
                m.id AS mood_id,
                m.mood,
                m.feeling,
                m.context,
                m.thread_ts,
                m.created_at AS mood_created_at
             FROM users u
             LEFT JOIN (
                SELECT
                    id,
                    user_id,
                    mood,
                    feeling,
                    context,
                    thread_ts,
                    created_at,
                    ROW_NUMBER() OVER (
                        PARTITION BY user_id ORDER BY created_at DESC, id DESC
                    ) AS position
                FROM daily_moods
                WHERE created_at >= ? AND created_at <= ?
             ) m ON m.user_id = u.id AND m.position <= ?
             ORDER BY u.username ASC, u.id ASC, m.created_at DESC, m.id DESC",
        )
        .bind(format_timestamp(window.start))
        .bind(format_timestamp(window.end))
        .bind(i64::from(window.limit_per_user))
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: Vec<UserWithMoods> = Vec::new();
        for row in &rows {
            let user = user_from_row(row)?;
            let is_same_user = grouped.last().is_some_and(|entry| entry.user.id == user.id);
            if !is_same_user {
                grouped.push(UserWithMoods { user, moods: Vec::new() });
            }

            if row.try_get::<Option<i64>, _>("mood_id")?.is_some() {
                let mood = joined_mood_from_row(row)?;
                if let Some(entry) = grouped.last_mut() {
                    entry.moods.push(mood);
                }
            }
        }

        Ok(grouped)
    }
}

pub(crate) fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        slack_user_id: SlackUserId(row.try_get("slack_user_id")?),
        username: row.try_get("username")?,
        slack_channel_id: row.try_get("slack_channel_id")?,
        is_manager: row.try_get("is_manager")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}
