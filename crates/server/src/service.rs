//! The bot's behaviour behind every routed Slack interaction and event.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use simba_core::domain::mood::{Mood, MoodId, ThreadKey};
use simba_core::domain::user::{NewUser, SlackUserId, FALLBACK_DISPLAY_NAME};
use simba_core::errors::{ApplicationError, InterfaceError};
use simba_core::thread_slot::{CurrentThread, ThreadNotifier};
use simba_db::MoodLedger;
use simba_slack::action::ModalMetadata;
use simba_slack::blocks::{
    daily_prompt, error_message, kind_message, mention_reply, LastBadMood, MessageTemplate,
};
use simba_slack::views::mood_modal;
use simba_slack::{
    EventContext, Interaction, MoodInteractionService, SlackApi, WorkspaceEventService,
};

use crate::content::ContentProvider;
use crate::home::HomeRenderer;

#[derive(Clone)]
pub struct MoodService {
    ledger: MoodLedger,
    slack: Arc<dyn SlackApi>,
    content: Arc<dyn ContentProvider>,
    home: HomeRenderer,
    register: CurrentThread,
    notifier: ThreadNotifier,
    prompt_channel: String,
}

impl MoodService {
    pub fn new(
        ledger: MoodLedger,
        slack: Arc<dyn SlackApi>,
        content: Arc<dyn ContentProvider>,
        home: HomeRenderer,
        register: CurrentThread,
        notifier: ThreadNotifier,
        prompt_channel: String,
    ) -> Self {
        Self { ledger, slack, content, home, register, notifier, prompt_channel }
    }

    /// Posts the daily prompt to the configured channel and makes it the
    /// current thread.
    pub async fn post_daily_prompt(&self) -> Result<ThreadKey, ApplicationError> {
        let message = self.render_prompt().await?;
        let ts = self.slack.post_message(&self.prompt_channel, &message).await?;
        let thread = ThreadKey(ts);
        self.publish_thread(&thread);

        info!(
            event_name = "scheduler.prompt.posted",
            channel_id = %self.prompt_channel,
            thread_id = %thread,
            "daily prompt posted"
        );
        Ok(thread)
    }

    async fn render_prompt(&self) -> Result<MessageTemplate, ApplicationError> {
        let quote = self.content.quote_of_the_day().await;
        let last_bad_mood = self.ledger.latest_with_mood(Mood::BadMood).await?.map(|(user, mood)| {
            LastBadMood {
                display_name: user.username,
                slack_user_id: user.slack_user_id.0,
                recorded_at: mood.created_at,
            }
        });
        Ok(daily_prompt(&quote, last_bad_mood.as_ref(), Utc::now().timestamp_millis()))
    }

    /// Re-renders the prompt so the "last co-worker in bad mood" section stays current.
    async fn refresh_prompt(&self, channel: &str, thread: &ThreadKey, ctx: &EventContext) {
        let refreshed = match self.render_prompt().await {
            Ok(message) => self
                .slack
                .update_message(channel, thread.as_str(), &message)
                .await
                .map_err(ApplicationError::from),
            Err(error) => Err(error),
        };
        if let Err(error) = refreshed {
            warn!(
                event_name = "mood.prompt.refresh_failed",
                correlation_id = %ctx.correlation_id,
                thread_id = %thread,
                error = %error,
                "could not refresh daily prompt"
            );
        }
    }

    fn publish_thread(&self, thread: &ThreadKey) {
        if !self.notifier.notify(thread.clone()) {
            warn!(
                event_name = "thread_slot.writer_stopped",
                thread_id = %thread,
                "current thread writer is gone; register not updated"
            );
        }
    }

    /// Modal metadata first, then the clicked message, then the latest prompt.
    fn resolve_thread(&self, interaction: &Interaction) -> Result<ThreadKey, ApplicationError> {
        interaction
            .metadata
            .as_ref()
            .map(|metadata| metadata.thread.clone())
            .or_else(|| interaction.message_ts.clone())
            .or_else(|| self.register.get())
            .ok_or_else(|| ApplicationError::NotFound("active daily prompt".to_owned()))
    }

    async fn display_name(&self, interaction: &Interaction, ctx: &EventContext) -> String {
        match self.slack.user_profile(&interaction.user_id).await {
            Ok(profile) => profile.preferred_name(),
            Err(error) => {
                warn!(
                    event_name = "mood.profile.failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %interaction.user_id,
                    error = %error,
                    "falling back to slack handle"
                );
                interaction
                    .user_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_owned())
            }
        }
    }
}

#[async_trait]
impl MoodInteractionService for MoodService {
    async fn record_mood(
        &self,
        interaction: &Interaction,
        mood: Mood,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let thread = self.resolve_thread(interaction)?;
        let display_name = self.display_name(interaction, ctx).await;
        let channel = interaction.channel_id.clone().unwrap_or_else(|| self.prompt_channel.clone());
        let new_user = NewUser {
            slack_user_id: interaction.user_id.clone(),
            username: display_name.clone(),
            slack_channel_id: channel.clone(),
        };

        let recorded = self.ledger.record_mood(&new_user, mood, &thread).await?;

        if let Some(trigger_id) = &interaction.trigger_id {
            let metadata = ModalMetadata { thread: thread.clone(), mood_id: recorded.id };
            let view = mood_modal(&display_name, mood, &metadata, Utc::now().timestamp_millis());
            if let Err(error) = self.slack.open_modal(trigger_id, &view).await {
                warn!(
                    event_name = "mood.modal.open_failed",
                    correlation_id = %ctx.correlation_id,
                    mood_id = recorded.id.0,
                    error = %error,
                    "could not open mood modal"
                );
            }
        }

        self.refresh_prompt(&channel, &thread, ctx).await;
        // Only the scheduler moves the register forward; a click re-seeds it after a restart.
        if self.register.get().is_none() {
            self.publish_thread(&thread);
        }
        Ok(())
    }

    async fn select_feeling(
        &self,
        interaction: &Interaction,
        feeling: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let thread = self.resolve_thread(interaction)?;
        let updated = self.ledger.set_feeling(&thread, &interaction.user_id, feeling).await?;
        info!(
            event_name = "mood.feeling.selected",
            correlation_id = %ctx.correlation_id,
            mood_id = updated.id.0,
            thread_id = %thread,
            "feeling selected"
        );
        Ok(())
    }

    async fn submit_context(
        &self,
        _interaction: &Interaction,
        mood_id: MoodId,
        context: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        self.ledger.set_context(mood_id, context).await?;
        info!(
            event_name = "mood.context.submitted",
            correlation_id = %ctx.correlation_id,
            mood_id = mood_id.0,
            "context submitted"
        );
        Ok(())
    }

    async fn channel_selected(
        &self,
        interaction: &Interaction,
        channel_id: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let view = self.home.render(&interaction.user_id, Some(channel_id)).await?;
        self.slack.publish_home_view(&interaction.user_id, &view).await?;
        info!(
            event_name = "home.channel.selected",
            correlation_id = %ctx.correlation_id,
            user_id = %interaction.user_id,
            channel_id,
            "home tab refreshed with channel members"
        );
        Ok(())
    }

    async fn send_kind_message(
        &self,
        interaction: &Interaction,
        target_user_id: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let sender = self.display_name(interaction, ctx).await;
        let buzz_word = self.content.buzz_word();
        let gif = self.content.gif_for(&buzz_word).await;

        let target = SlackUserId(target_user_id.to_owned());
        let channel = self.slack.open_direct_message(&target).await?;
        let message = kind_message(&sender, &buzz_word, gif.as_deref());
        self.slack.post_message(&channel, &message).await?;

        info!(
            event_name = "mood.kindness.sent",
            correlation_id = %ctx.correlation_id,
            user_id = %interaction.user_id,
            target_user_id,
            with_gif = gif.is_some(),
            "kind message sent"
        );
        Ok(())
    }

    async fn notify_failure(&self, interaction: &Interaction, error: &InterfaceError) {
        let message = error_message(error.user_message(), error.correlation_id());
        let delivered = match &interaction.channel_id {
            Some(channel) => {
                self.slack.post_ephemeral(channel, &interaction.user_id, &message).await
            }
            None => match self.slack.open_direct_message(&interaction.user_id).await {
                Ok(channel) => self.slack.post_message(&channel, &message).await.map(|_| ()),
                Err(error) => Err(error),
            },
        };

        if let Err(delivery) = delivered {
            warn!(
                event_name = "mood.notify.failed",
                correlation_id = %error.correlation_id(),
                user_id = %interaction.user_id,
                error = %delivery,
                "could not deliver error notification"
            );
        }
    }
}

#[async_trait]
impl WorkspaceEventService for MoodService {
    async fn app_home_opened(
        &self,
        user_id: &SlackUserId,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        let view = self.home.render(user_id, None).await?;
        self.slack.publish_home_view(user_id, &view).await?;
        info!(
            event_name = "home.published",
            correlation_id = %ctx.correlation_id,
            user_id = %user_id,
            "home tab published"
        );
        Ok(())
    }

    async fn app_mention(
        &self,
        user_id: &SlackUserId,
        channel_id: &str,
        _ts: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError> {
        self.slack.post_message(channel_id, &mention_reply()).await?;
        info!(
            event_name = "slack.mention.replied",
            correlation_id = %ctx.correlation_id,
            user_id = %user_id,
            channel_id,
            "replied to mention"
        );
        Ok(())
    }
}
