//! Outbound Slack Web API.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use simba_core::domain::user::{resolve_display_name, SlackUserId};
use simba_core::errors::ApplicationError;

use crate::blocks::MessageTemplate;
use crate::views::View;

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack transport failure calling {method}: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("slack method {method} returned `{error}`")]
    Api { method: &'static str, error: String },
    #[error("slack method {method} returned an unexpected body: {reason}")]
    Decode { method: &'static str, reason: String },
}

impl From<SlackApiError> for ApplicationError {
    fn from(value: SlackApiError) -> Self {
        ApplicationError::Integration(value.to_string())
    }
}

/// Profile fields the bot cares about.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlackProfile {
    pub user_id: String,
    pub display_name: Option<String>,
    pub real_name: Option<String>,
    pub is_admin: bool,
}

impl SlackProfile {
    pub fn preferred_name(&self) -> String {
        resolve_display_name(self.display_name.as_deref(), self.real_name.as_deref())
    }
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn user_profile(&self, user: &SlackUserId) -> Result<SlackProfile, SlackApiError>;

    /// Returns the `ts` of the posted message.
    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<String, SlackApiError>;

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &SlackUserId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError>;

    async fn open_modal(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError>;

    async fn publish_home_view(&self, user: &SlackUserId, view: &View) -> Result<(), SlackApiError>;

    async fn list_channel_members(&self, channel: &str) -> Result<Vec<String>, SlackApiError>;

    /// Opens (or reuses) the IM channel with `user` and returns its id.
    async fn open_direct_message(&self, user: &SlackUserId) -> Result<String, SlackApiError>;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    rest: Value,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: UserInfoUser,
}

#[derive(Debug, Deserialize)]
struct UserInfoUser {
    id: String,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    is_owner: bool,
    #[serde(default)]
    profile: UserInfoProfile,
}

#[derive(Debug, Default, Deserialize)]
struct UserInfoProfile {
    display_name: Option<String>,
    real_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostedMessage {
    ts: String,
}

#[derive(Debug, Deserialize)]
struct ChannelMembers {
    members: Vec<String>,
    #[serde(default)]
    response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
struct ResponseMetadata {
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenedConversation {
    channel: OpenedChannel,
}

#[derive(Debug, Deserialize)]
struct OpenedChannel {
    id: String,
}

/// `reqwest` implementation of [`SlackApi`] using a bot token.
#[derive(Clone)]
pub struct HttpSlackClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl std::fmt::Debug for HttpSlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSlackClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl HttpSlackClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| SlackApiError::Transport { method: "client.build", source })?;
        Ok(Self { http, base_url: base_url.into().trim_end_matches('/').to_owned(), token })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: Value,
    ) -> Result<T, SlackApiError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;
        debug!(event_name = "slack.api.called", method, ok = envelope.ok, "slack api call");

        decode_envelope(method, envelope)
    }

    async fn call_form<T: DeserializeOwned>(
        &self,
        method: &'static str,
        query: &[(&str, &str)],
    ) -> Result<T, SlackApiError> {
        // Read methods such as users.info only accept form or query arguments.
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;

        let envelope: Envelope = response
            .json()
            .await
            .map_err(|source| SlackApiError::Transport { method, source })?;
        debug!(event_name = "slack.api.called", method, ok = envelope.ok, "slack api call");

        decode_envelope(method, envelope)
    }
}

fn decode_envelope<T: DeserializeOwned>(
    method: &'static str,
    envelope: Envelope,
) -> Result<T, SlackApiError> {
    if !envelope.ok {
        return Err(SlackApiError::Api {
            method,
            error: envelope.error.unwrap_or_else(|| "unknown_error".to_owned()),
        });
    }
    serde_json::from_value(envelope.rest)
        .map_err(|error| SlackApiError::Decode { method, reason: error.to_string() })
}

fn message_body(channel: &str, message: &MessageTemplate) -> Value {
    json!({
        "channel": channel,
        "text": message.fallback_text,
        "blocks": message.blocks,
    })
}

#[async_trait]
impl SlackApi for HttpSlackClient {
    async fn user_profile(&self, user: &SlackUserId) -> Result<SlackProfile, SlackApiError> {
        let info: UserInfo = self.call_form("users.info", &[("user", user.as_str())]).await?;
        Ok(SlackProfile {
            user_id: info.user.id,
            display_name: info.user.profile.display_name,
            real_name: info.user.profile.real_name,
            is_admin: info.user.is_admin || info.user.is_owner,
        })
    }

    async fn post_message(
        &self,
        channel: &str,
        message: &MessageTemplate,
    ) -> Result<String, SlackApiError> {
        let posted: PostedMessage =
            self.call("chat.postMessage", message_body(channel, message)).await?;
        Ok(posted.ts)
    }

    async fn update_message(
        &self,
        channel: &str,
        ts: &str,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let mut body = message_body(channel, message);
        body["ts"] = Value::String(ts.to_owned());
        let _: Value = self.call("chat.update", body).await?;
        Ok(())
    }

    async fn post_ephemeral(
        &self,
        channel: &str,
        user: &SlackUserId,
        message: &MessageTemplate,
    ) -> Result<(), SlackApiError> {
        let mut body = message_body(channel, message);
        body["user"] = Value::String(user.as_str().to_owned());
        let _: Value = self.call("chat.postEphemeral", body).await?;
        Ok(())
    }

    async fn open_modal(&self, trigger_id: &str, view: &View) -> Result<(), SlackApiError> {
        let _: Value =
            self.call("views.open", json!({ "trigger_id": trigger_id, "view": view })).await?;
        Ok(())
    }

    async fn publish_home_view(
        &self,
        user: &SlackUserId,
        view: &View,
    ) -> Result<(), SlackApiError> {
        let _: Value =
            self.call("views.publish", json!({ "user_id": user.as_str(), "view": view })).await?;
        Ok(())
    }

    async fn list_channel_members(&self, channel: &str) -> Result<Vec<String>, SlackApiError> {
        let mut members = Vec::new();
        let mut cursor = String::new();
        loop {
            let mut query = vec![("channel", channel), ("limit", "200")];
            if !cursor.is_empty() {
                query.push(("cursor", cursor.as_str()));
            }
            let page: ChannelMembers = self.call_form("conversations.members", &query).await?;
            members.extend(page.members);

            match page.response_metadata.and_then(|meta| meta.next_cursor) {
                Some(next) if !next.is_empty() => cursor = next,
                _ => break,
            }
        }
        Ok(members)
    }

    async fn open_direct_message(&self, user: &SlackUserId) -> Result<String, SlackApiError> {
        let opened: OpenedConversation =
            self.call("conversations.open", json!({ "users": user.as_str() })).await?;
        Ok(opened.channel.id)
    }
}
