//! Mood ledger: one active mood per user and prompt thread.
//!
//! Picking a mood again on an answered thread deletes the previous entry and
//! records a fresh one, so feeling and context start over with the new pick.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use simba_core::aggregate::MoodWindow;
use simba_core::domain::mood::{require_text, DailyMood, Mood, MoodId, ThreadKey};
use simba_core::domain::user::{NewUser, SlackUserId, User, UserWithMoods};
use simba_core::errors::{ApplicationError, DomainError};

use crate::repositories::{MoodRepository, RepositoryError, UserRepository};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error("storage failure: {0}")]
    Storage(#[from] RepositoryError),
}

impl From<LedgerError> for ApplicationError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::NotFound(what) => ApplicationError::NotFound(what),
            LedgerError::Validation(error) => ApplicationError::Domain(error),
            LedgerError::Storage(error) => ApplicationError::Persistence(error.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct MoodLedger {
    users: Arc<dyn UserRepository>,
    moods: Arc<dyn MoodRepository>,
}

impl MoodLedger {
    pub fn new(users: Arc<dyn UserRepository>, moods: Arc<dyn MoodRepository>) -> Self {
        Self { users, moods }
    }

    pub async fn record_mood(
        &self,
        new_user: &NewUser,
        mood: Mood,
        thread: &ThreadKey,
    ) -> Result<DailyMood, LedgerError> {
        let user = self.users.find_or_create(new_user).await?;

        let recorded = match self.moods.find_by_thread(thread, user.id).await? {
            Some(_) => self.moods.replace(user.id, mood, thread).await?,
            None => match self.moods.create(user.id, mood, thread).await {
                Ok(created) => created,
                // A concurrent first click won the insert; take the resubmission path.
                Err(RepositoryError::Conflict(reason)) => {
                    debug!(event_name = "mood.ledger.conflict", %reason, "retrying as replace");
                    self.moods.replace(user.id, mood, thread).await?
                }
                Err(error) => return Err(error.into()),
            },
        };

        info!(
            event_name = "mood.ledger.recorded",
            user_id = user.id.0,
            mood_id = recorded.id.0,
            mood = mood.as_str(),
            thread_id = thread.as_str(),
            "mood recorded"
        );
        Ok(recorded)
    }

    pub async fn set_feeling(
        &self,
        thread: &ThreadKey,
        slack_user_id: &SlackUserId,
        feeling: &str,
    ) -> Result<DailyMood, LedgerError> {
        let feeling = require_text("feeling", feeling)?;
        let user = self.require_user(slack_user_id).await?;
        let existing = self
            .moods
            .find_by_thread(thread, user.id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("mood for thread {thread}")))?;

        let updated = self
            .moods
            .update_fields(existing.id, Some(&feeling), None)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("mood {}", existing.id)))?;

        info!(
            event_name = "mood.ledger.feeling_set",
            user_id = user.id.0,
            mood_id = updated.id.0,
            thread_id = thread.as_str(),
            "feeling recorded"
        );
        Ok(updated)
    }

    pub async fn set_context(&self, id: MoodId, context: &str) -> Result<DailyMood, LedgerError> {
        let context = require_text("context", context)?;
        let updated = self
            .moods
            .update_fields(id, None, Some(&context))
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("mood {id}")))?;

        info!(event_name = "mood.ledger.context_set", mood_id = id.0, "context recorded");
        Ok(updated)
    }

    pub async fn find_user(
        &self,
        slack_user_id: &SlackUserId,
    ) -> Result<Option<User>, LedgerError> {
        Ok(self.users.find_by_slack_id(slack_user_id).await?)
    }

    pub async fn recent_moods(
        &self,
        user: &User,
        limit: u32,
    ) -> Result<Vec<DailyMood>, LedgerError> {
        Ok(self.moods.list_recent_for_user(user.id, limit).await?)
    }

    pub async fn latest_with_mood(
        &self,
        mood: Mood,
    ) -> Result<Option<(User, DailyMood)>, LedgerError> {
        Ok(self.moods.latest_with_mood(mood).await?)
    }

    pub async fn users_with_moods(
        &self,
        window: &MoodWindow,
    ) -> Result<Vec<UserWithMoods>, LedgerError> {
        Ok(self.users.list_with_moods_in_window(window).await?)
    }

    async fn require_user(&self, slack_user_id: &SlackUserId) -> Result<User, LedgerError> {
        self.users
            .find_by_slack_id(slack_user_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("user {slack_user_id}")))
    }
}
