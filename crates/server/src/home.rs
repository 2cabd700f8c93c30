//! Home-tab rendering: managers and workspace admins get the team dashboard,
//! everyone else their own recent moods.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use simba_core::aggregate::{
    global_breakdown, per_user_breakdown, MoodWindow, INDIVIDUAL_WINDOW_LIMIT,
};
use simba_core::domain::user::{SlackUserId, FALLBACK_DISPLAY_NAME};
use simba_core::errors::ApplicationError;
use simba_db::MoodLedger;
use simba_slack::views::{individual_home, manager_home, ChannelMember, ManagerDashboard, View};
use simba_slack::SlackApi;

#[derive(Clone)]
pub struct HomeRenderer {
    ledger: MoodLedger,
    slack: Arc<dyn SlackApi>,
}

impl HomeRenderer {
    pub fn new(ledger: MoodLedger, slack: Arc<dyn SlackApi>) -> Self {
        Self { ledger, slack }
    }

    /// `channel` lists that channel's members on the manager dashboard.
    pub async fn render(
        &self,
        user_id: &SlackUserId,
        channel: Option<&str>,
    ) -> Result<View, ApplicationError> {
        let stored = self.ledger.find_user(user_id).await?;
        let is_admin = match self.slack.user_profile(user_id).await {
            Ok(profile) => profile.is_admin,
            Err(error) => {
                warn!(
                    event_name = "home.profile.failed",
                    user_id = %user_id,
                    error = %error,
                    "could not check admin status"
                );
                false
            }
        };
        let is_manager = stored.as_ref().is_some_and(|user| user.is_manager);

        if !(is_manager || is_admin) {
            let recent = match &stored {
                Some(user) => self.ledger.recent_moods(user, INDIVIDUAL_WINDOW_LIMIT).await?,
                None => Vec::new(),
            };
            debug!(
                event_name = "home.individual.rendered",
                user_id = %user_id,
                entries = recent.len()
            );
            return Ok(individual_home(&recent));
        }

        let users = self.ledger.users_with_moods(&MoodWindow::manager(Utc::now())).await?;
        let channel_members = match channel {
            Some(channel) => Some(self.channel_members(channel).await?),
            None => None,
        };
        let dashboard = ManagerDashboard {
            global: global_breakdown(&users),
            per_user: per_user_breakdown(&users),
            channel_members,
        };
        debug!(event_name = "home.manager.rendered", user_id = %user_id, users = users.len());
        Ok(manager_home(&dashboard, Utc::now().timestamp_millis()))
    }

    async fn channel_members(&self, channel: &str) -> Result<Vec<ChannelMember>, ApplicationError> {
        let ids = self.slack.list_channel_members(channel).await?;
        let mut members = Vec::with_capacity(ids.len());
        for id in ids {
            let slack_user_id = SlackUserId(id);
            let display_name = match self.slack.user_profile(&slack_user_id).await {
                Ok(profile) => profile.preferred_name(),
                Err(error) => {
                    warn!(
                        event_name = "home.member_profile.failed",
                        user_id = %slack_user_id,
                        error = %error,
                        "using fallback member name"
                    );
                    FALLBACK_DISPLAY_NAME.to_owned()
                }
            };
            members.push(ChannelMember { slack_user_id: slack_user_id.0, display_name });
        }
        Ok(members)
    }
}
