use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use simba_core::domain::mood::{DailyMood, Mood, MoodId, ThreadKey};
use simba_core::domain::user::{User, UserId};

use super::user::user_from_row;
use super::{
    format_timestamp, map_unique_violation, parse_mood, parse_timestamp, MoodRepository,
    RepositoryError,
};
use crate::DbPool;

const MOOD_COLUMNS: &str = "id, user_id, mood, feeling, context, thread_ts, created_at";

pub struct SqlMoodRepository {
    pool: DbPool,
}

impl SqlMoodRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl MoodRepository for SqlMoodRepository {
    async fn create(
        &self,
        user_id: UserId,
        mood: Mood,
        thread: &ThreadKey,
    ) -> Result<DailyMood, RepositoryError> {
        let created_at = Utc::now();
        let stamp = format_timestamp(created_at);
        let result = sqlx::query(
            "INSERT INTO daily_moods
                 (user_id, mood, feeling, context, thread_ts, created_at, updated_at)
             VALUES (?, ?, NULL, NULL, ?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(mood.as_str())
        .bind(thread.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            let detail = format!("user {} already answered thread {thread}", user_id.0);
            map_unique_violation(error, detail)
        })?;

        Ok(DailyMood {
            id: MoodId(result.last_insert_rowid()),
            user_id,
            mood,
            feeling: None,
            context: None,
            thread_ts: thread.clone(),
            created_at: parse_timestamp("created_at", stamp)?,
        })
    }

    async fn find_by_id(&self, id: MoodId) -> Result<Option<DailyMood>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {MOOD_COLUMNS} FROM daily_moods WHERE id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(mood_from_row).transpose()
    }

    async fn find_by_thread(
        &self,
        thread: &ThreadKey,
        user_id: UserId,
    ) -> Result<Option<DailyMood>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MOOD_COLUMNS} FROM daily_moods WHERE thread_ts = ? AND user_id = ?"
        ))
        .bind(thread.as_str())
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(mood_from_row).transpose()
    }

    async fn update_fields(
        &self,
        id: MoodId,
        feeling: Option<&str>,
        context: Option<&str>,
    ) -> Result<Option<DailyMood>, RepositoryError> {
        let result = sqlx::query(
            "UPDATE daily_moods
             SET feeling = COALESCE(?, feeling),
                 context = COALESCE(?, context),
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(feeling)
        .bind(context)
        .bind(format_timestamp(Utc::now()))
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    async fn delete(&self, id: MoodId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM daily_moods WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn replace(
        &self,
        user_id: UserId,
        mood: Mood,
        thread: &ThreadKey,
    ) -> Result<DailyMood, RepositoryError> {
        let stamp = format_timestamp(Utc::now());
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM daily_moods WHERE user_id = ? AND thread_ts = ?")
            .bind(user_id.0)
            .bind(thread.as_str())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "INSERT INTO daily_moods
                 (user_id, mood, feeling, context, thread_ts, created_at, updated_at)
             VALUES (?, ?, NULL, NULL, ?, ?, ?)",
        )
        .bind(user_id.0)
        .bind(mood.as_str())
        .bind(thread.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .execute(&mut *tx)
        .await
        .map_err(|error| {
            let detail = format!("user {} already answered thread {thread}", user_id.0);
            map_unique_violation(error, detail)
        })?;

        tx.commit().await?;

        Ok(DailyMood {
            id: MoodId(result.last_insert_rowid()),
            user_id,
            mood,
            feeling: None,
            context: None,
            thread_ts: thread.clone(),
            created_at: parse_timestamp("created_at", stamp)?,
        })
    }

    async fn list_recent_for_user(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<DailyMood>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MOOD_COLUMNS} FROM daily_moods
             WHERE user_id = ?
             ORDER BY created_at DESC, id DESC
             LIMIT ?"
        ))
        .bind(user_id.0)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(mood_from_row).collect()
    }

    async fn latest_with_mood(
        &self,
        mood: Mood,
    ) -> Result<Option<(User, DailyMood)>, RepositoryError> {
        let row = sqlx::query(
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
             FROM daily_moods m
             JOIN users u ON u.id = m.user_id
             WHERE m.mood = ?
             ORDER BY m.created_at DESC, m.id DESC
             LIMIT 1",
        )
        .bind(mood.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref()
            .map(|row| Ok((user_from_row(row)?, joined_mood_from_row(row)?)))
            .transpose()
    }
}

fn mood_from_row(row: &SqliteRow) -> Result<DailyMood, RepositoryError> {
    Ok(DailyMood {
        id: MoodId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        mood: parse_mood("mood", row.try_get("mood")?)?,
        feeling: row.try_get("feeling")?,
        context: row.try_get("context")?,
        thread_ts: ThreadKey(row.try_get("thread_ts")?),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

/// Decodes the mood half of a `users JOIN daily_moods` row.
pub(crate) fn joined_mood_from_row(row: &SqliteRow) -> Result<DailyMood, RepositoryError> {
    Ok(DailyMood {
        id: MoodId(row.try_get("mood_id")?),
        user_id: UserId(row.try_get("id")?),
        mood: parse_mood("mood", row.try_get("mood")?)?,
        feeling: row.try_get("feeling")?,
        context: row.try_get("context")?,
        thread_ts: ThreadKey(row.try_get("thread_ts")?),
        created_at: parse_timestamp("mood_created_at", row.try_get("mood_created_at")?)?,
    })
}

#[cfg(test)]
mod tests {
    use simba_core::domain::mood::{Mood, MoodId, ThreadKey};
    use simba_core::domain::user::{NewUser, SlackUserId, User};

    use super::SqlMoodRepository;
    use crate::migrations;
    use crate::repositories::{MoodRepository, RepositoryError, SqlUserRepository, UserRepository};
    use crate::{connect_with_settings, DbPool};

    async fn setup() -> (DbPool, SqlMoodRepository, User) {
        let pool =
            connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        let user = SqlUserRepository::new(pool.clone())
            .find_or_create(&NewUser {
                slack_user_id: SlackUserId("U1".into()),
                username: "kitty".into(),
                slack_channel_id: "C1".into(),
            })
            .await
            .expect("create user");
        (pool.clone(), SqlMoodRepository::new(pool), user)
    }

    #[tokio::test]
    async fn second_insert_for_same_thread_is_a_conflict() {
        let (_pool, repo, user) = setup().await;
        let thread = ThreadKey("1700000000.000100".into());

        repo.create(user.id, Mood::GoodMood, &thread).await.expect("first insert");
        let error = repo.create(user.id, Mood::BadMood, &thread).await.expect_err("duplicate");

        assert!(matches!(error, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_fields_leaves_absent_columns_untouched() {
        let (_pool, repo, user) = setup().await;
        let created =
            repo.create(user.id, Mood::BadMood, &ThreadKey("T1".into())).await.expect("insert");

        repo.update_fields(created.id, Some("Sad"), None).await.expect("set feeling");
        let updated = repo
            .update_fields(created.id, None, Some("rough deploy"))
            .await
            .expect("set context")
            .expect("row exists");

        assert_eq!(updated.feeling.as_deref(), Some("Sad"));
        assert_eq!(updated.context.as_deref(), Some("rough deploy"));
        assert_eq!(updated.mood, Mood::BadMood);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let (_pool, repo, _user) = setup().await;

        assert!(repo.update_fields(MoodId(999), Some("x"), None).await.expect("update").is_none());
        assert!(!repo.delete(MoodId(999)).await.expect("delete"));
    }

    #[tokio::test]
    async fn replace_keeps_a_single_row_per_thread() {
        let (pool, repo, user) = setup().await;
        let thread = ThreadKey("T1".into());
        let first = repo.create(user.id, Mood::GoodMood, &thread).await.expect("insert");
        repo.update_fields(first.id, Some("Happy"), Some("sunny")).await.expect("fill");

        let replaced = repo.replace(user.id, Mood::BadMood, &thread).await.expect("replace");

        assert_ne!(replaced.id, first.id);
        assert_eq!(replaced.feeling, None);
        assert_eq!(replaced.context, None);

        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM daily_moods WHERE thread_ts = 'T1'")
                .fetch_one(&pool)
                .await
                .expect("count");
        assert_eq!(count, 1);
        assert_eq!(
            repo.find_by_thread(&thread, user.id).await.expect("find").map(|mood| mood.mood),
            Some(Mood::BadMood)
        );
    }

    #[tokio::test]
    async fn recent_moods_and_latest_bad_mood() {
        let (_pool, repo, user) = setup().await;
        for (index, mood) in [Mood::BadMood, Mood::GoodMood, Mood::BadMood, Mood::AverageMood]
            .into_iter()
            .enumerate()
        {
            repo.create(user.id, mood, &ThreadKey(format!("T{index}"))).await.expect("insert");
        }

        let recent = repo.list_recent_for_user(user.id, 3).await.expect("recent");
        let threads: Vec<&str> = recent.iter().map(|mood| mood.thread_ts.as_str()).collect();
        assert_eq!(threads, vec!["T3", "T2", "T1"]);

        let (owner, latest_bad) =
            repo.latest_with_mood(Mood::BadMood).await.expect("latest").expect("some bad mood");
        assert_eq!(owner.username, "kitty");
        assert_eq!(latest_bad.thread_ts.as_str(), "T2");
    }
}
