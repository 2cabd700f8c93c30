//! Inbound Slack payloads and the routers that hand them to services.
//!
//! Interactions (`block_actions`, `view_submission`) reach the bot as a form
//! field named `payload`; Events API callbacks arrive as raw JSON. Both are
//! decoded once into typed values here, then dispatched with an exhaustive
//! match over [`InteractionAction`] and [`SlackEvent`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, warn};

use simba_core::domain::mood::{Mood, MoodId, ThreadKey};
use simba_core::domain::user::SlackUserId;
use simba_core::errors::{ApplicationError, DomainError, InterfaceError};

use crate::action::{
    decode_action, ActionDecodeError, InteractionAction, ModalMetadata, RawAction,
    CONTEXT_ACTION_ID, CONTEXT_BLOCK_ID,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    /// `url_verification` handshake; the body must echo the challenge.
    Challenge(String),
    Processed,
    Ignored,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("request body has no `payload` field")]
    MissingPayload,
    #[error("malformed slack payload: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("ActionId({action_id}) = {value} is not registered")]
    NoActionFound { action_id: String, value: String },
    #[error("invalid interaction payload: {0}")]
    Payload(String),
    #[error(transparent)]
    Service(#[from] ApplicationError),
}

impl From<ActionDecodeError> for DispatchError {
    fn from(value: ActionDecodeError) -> Self {
        match value {
            ActionDecodeError::NoActionFound { action_id, value } => {
                Self::NoActionFound { action_id, value }
            }
            ActionDecodeError::InvalidValue { source, .. } => {
                Self::Service(ApplicationError::Domain(source))
            }
        }
    }
}

impl From<DispatchError> for ApplicationError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::NoActionFound { action_id, value } => {
                ApplicationError::NoActionFound { action_id, action_value: value }
            }
            DispatchError::Payload(reason) => {
                ApplicationError::Domain(DomainError::InvariantViolation(reason))
            }
            DispatchError::Service(error) => error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InteractionKind {
    BlockActions,
    ViewSubmission,
}

/// A decoded interactive request. Actions are still raw; the router decodes
/// them one at a time so a bad id only aborts its own interaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interaction {
    pub kind: InteractionKind,
    pub user_id: SlackUserId,
    pub user_name: Option<String>,
    pub channel_id: Option<String>,
    pub message_ts: Option<ThreadKey>,
    pub trigger_id: Option<String>,
    pub metadata: Option<ModalMetadata>,
    pub actions: Vec<RawAction>,
}

#[derive(Debug, Deserialize)]
struct WireInteraction {
    #[serde(rename = "type")]
    kind: String,
    user: WireUser,
    trigger_id: Option<String>,
    channel: Option<WireChannel>,
    container: Option<WireContainer>,
    message: Option<WireMessage>,
    view: Option<WireView>,
    #[serde(default)]
    actions: Vec<WireAction>,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    username: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChannel {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WireContainer {
    message_ts: Option<String>,
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    ts: String,
}

#[derive(Debug, Deserialize)]
struct WireView {
    private_metadata: Option<String>,
    state: Option<WireState>,
}

#[derive(Debug, Deserialize)]
struct WireState {
    #[serde(default)]
    values: HashMap<String, HashMap<String, WireStateValue>>,
}

#[derive(Debug, Deserialize)]
struct WireStateValue {
    value: Option<String>,
    selected_option: Option<WireOption>,
}

#[derive(Debug, Deserialize)]
struct WireOption {
    value: String,
}

#[derive(Debug, Deserialize)]
struct WireAction {
    action_id: String,
    value: Option<String>,
    selected_option: Option<WireOption>,
    selected_channel: Option<String>,
}

/// Decodes an `application/x-www-form-urlencoded` interactive request body.
pub fn parse_interaction_form(body: &[u8]) -> Result<Interaction, PayloadError> {
    let payload = url::form_urlencoded::parse(body)
        .find(|(key, _)| key == "payload")
        .map(|(_, value)| value.into_owned())
        .ok_or(PayloadError::MissingPayload)?;
    parse_interaction_json(&payload)
}

pub fn parse_interaction_json(payload: &str) -> Result<Interaction, PayloadError> {
    let wire: WireInteraction =
        serde_json::from_str(payload).map_err(|error| PayloadError::Malformed(error.to_string()))?;

    let kind = match wire.kind.as_str() {
        "block_actions" => InteractionKind::BlockActions,
        "view_submission" => InteractionKind::ViewSubmission,
        other => return Err(PayloadError::Malformed(format!("unsupported interaction `{other}`"))),
    };

    let metadata = wire
        .view
        .as_ref()
        .and_then(|view| view.private_metadata.as_deref())
        .and_then(ModalMetadata::parse);

    let actions = match kind {
        InteractionKind::BlockActions => wire
            .actions
            .into_iter()
            .map(|action| RawAction {
                action_id: action.action_id,
                value: action.value,
                selected_option: action.selected_option.map(|option| option.value),
                selected_channel: action.selected_channel,
            })
            .collect(),
        InteractionKind::ViewSubmission => wire
            .view
            .as_ref()
            .and_then(|view| view.state.as_ref())
            .and_then(|state| state.values.get(CONTEXT_BLOCK_ID))
            .and_then(|block| block.get(CONTEXT_ACTION_ID))
            .map(|field| RawAction {
                action_id: CONTEXT_ACTION_ID.to_owned(),
                value: field.value.clone(),
                selected_option: field.selected_option.as_ref().map(|option| option.value.clone()),
                selected_channel: None,
            })
            .into_iter()
            .collect(),
    };

    let message_ts = wire
        .container
        .as_ref()
        .and_then(|container| container.message_ts.clone())
        .or(wire.message.map(|message| message.ts))
        .map(ThreadKey);
    let channel_id = wire
        .channel
        .map(|channel| channel.id)
        .or(wire.container.and_then(|container| container.channel_id));

    Ok(Interaction {
        kind,
        user_id: SlackUserId(wire.user.id),
        user_name: wire.user.username.or(wire.user.name),
        channel_id,
        message_ts,
        trigger_id: wire.trigger_id,
        metadata,
        actions,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    UrlVerification { challenge: String },
    AppHomeOpened { user_id: SlackUserId },
    AppMention { user_id: SlackUserId, channel_id: String, ts: String },
    Unsupported { event_type: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: WireEvent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(rename = "type")]
    kind: String,
    user: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
    tab: Option<String>,
    bot_id: Option<String>,
}

pub fn parse_event(body: &[u8]) -> Result<SlackEvent, PayloadError> {
    let envelope: WireEnvelope =
        serde_json::from_slice(body).map_err(|error| PayloadError::Malformed(error.to_string()))?;

    let event = match envelope {
        WireEnvelope::UrlVerification { challenge } => SlackEvent::UrlVerification { challenge },
        WireEnvelope::Other => SlackEvent::Unsupported { event_type: "unknown".to_owned() },
        WireEnvelope::EventCallback { event } => match (event.kind.as_str(), event.user) {
            // Only the home tab refreshes; the messages tab opens the same event.
            ("app_home_opened", Some(user)) if event.tab.as_deref().unwrap_or("home") == "home" => {
                SlackEvent::AppHomeOpened { user_id: SlackUserId(user) }
            }
            ("app_mention", Some(user)) if event.bot_id.is_none() => SlackEvent::AppMention {
                user_id: SlackUserId(user),
                channel_id: event.channel.unwrap_or_default(),
                ts: event.ts.unwrap_or_default(),
            },
            (kind, _) => SlackEvent::Unsupported { event_type: kind.to_owned() },
        },
    };

    Ok(event)
}

/// Handlers behind every mood interaction. Implementations resolve the
/// thread, call the ledger and render follow-up views.
#[async_trait]
pub trait MoodInteractionService: Send + Sync {
    async fn record_mood(
        &self,
        interaction: &Interaction,
        mood: Mood,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    async fn select_feeling(
        &self,
        interaction: &Interaction,
        feeling: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    async fn submit_context(
        &self,
        interaction: &Interaction,
        mood_id: MoodId,
        context: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    async fn channel_selected(
        &self,
        interaction: &Interaction,
        channel_id: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    async fn send_kind_message(
        &self,
        interaction: &Interaction,
        target_user_id: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    /// Tells the user their interaction failed. Must not fail itself.
    async fn notify_failure(&self, interaction: &Interaction, error: &InterfaceError);
}

pub struct InteractionRouter<S> {
    service: S,
}

impl<S> InteractionRouter<S>
where
    S: MoodInteractionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs every action in order, stopping at the first failure. Failures are
    /// logged and reported to the user before being returned.
    pub async fn dispatch(
        &self,
        interaction: &Interaction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        if interaction.actions.is_empty() {
            debug!(
                event_name = "slack.interaction.empty",
                correlation_id = %ctx.correlation_id,
                user_id = %interaction.user_id,
                "interaction carried no actions"
            );
            return Ok(HandlerResult::Ignored);
        }

        let mut result = HandlerResult::Ignored;
        for raw in &interaction.actions {
            match self.run(interaction, raw, ctx).await {
                Ok(HandlerResult::Processed) => result = HandlerResult::Processed,
                Ok(_) => {}
                Err(failure) => {
                    self.report(interaction, raw, &failure, ctx).await;
                    return Err(failure);
                }
            }
        }

        Ok(result)
    }

    async fn run(
        &self,
        interaction: &Interaction,
        raw: &RawAction,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let action = decode_action(raw)?;
        debug!(
            event_name = "slack.interaction.routed",
            correlation_id = %ctx.correlation_id,
            action = action.name(),
            action_id = %raw.action_id,
            "routing interaction"
        );

        match action {
            InteractionAction::RecordMood { mood } => {
                self.service.record_mood(interaction, mood, ctx).await?;
            }
            InteractionAction::SelectFeeling { feeling } => {
                self.service.select_feeling(interaction, &feeling, ctx).await?;
            }
            InteractionAction::SubmitContext { context } => {
                if context.trim().is_empty() {
                    return Ok(HandlerResult::Ignored);
                }
                let metadata = interaction.metadata.as_ref().ok_or_else(|| {
                    DispatchError::Payload("context submitted without mood metadata".to_owned())
                })?;
                self.service.submit_context(interaction, metadata.mood_id, &context, ctx).await?;
            }
            InteractionAction::ChannelSelected { channel_id } => {
                if channel_id.is_empty() {
                    return Err(DispatchError::Payload("channel selection without channel".into()));
                }
                self.service.channel_selected(interaction, &channel_id, ctx).await?;
            }
            InteractionAction::SendKindMessage { target_user_id } => {
                if target_user_id.is_empty() {
                    return Err(DispatchError::Payload("kind message without recipient".into()));
                }
                self.service.send_kind_message(interaction, &target_user_id, ctx).await?;
            }
        }

        Ok(HandlerResult::Processed)
    }

    async fn report(
        &self,
        interaction: &Interaction,
        raw: &RawAction,
        failure: &DispatchError,
        ctx: &EventContext,
    ) {
        let interface = ApplicationError::from(failure.clone()).into_interface(&ctx.correlation_id);
        error!(
            event_name = "slack.interaction.failed",
            correlation_id = %ctx.correlation_id,
            user_id = %interaction.user_id,
            action_id = %raw.action_id,
            error = %failure,
            "interaction failed"
        );
        self.service.notify_failure(interaction, &interface).await;
    }
}

#[async_trait]
pub trait WorkspaceEventService: Send + Sync {
    async fn app_home_opened(
        &self,
        user_id: &SlackUserId,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;

    async fn app_mention(
        &self,
        user_id: &SlackUserId,
        channel_id: &str,
        ts: &str,
        ctx: &EventContext,
    ) -> Result<(), ApplicationError>;
}

pub struct EventRouter<S> {
    service: S,
}

impl<S> EventRouter<S>
where
    S: WorkspaceEventService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn dispatch(
        &self,
        event: &SlackEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        match event {
            SlackEvent::UrlVerification { challenge } => {
                Ok(HandlerResult::Challenge(challenge.clone()))
            }
            SlackEvent::AppHomeOpened { user_id } => {
                self.service.app_home_opened(user_id, ctx).await?;
                Ok(HandlerResult::Processed)
            }
            SlackEvent::AppMention { user_id, channel_id, ts } => {
                self.service.app_mention(user_id, channel_id, ts, ctx).await?;
                Ok(HandlerResult::Processed)
            }
            SlackEvent::Unsupported { event_type } => {
                warn!(
                    event_name = "slack.event.unsupported",
                    correlation_id = %ctx.correlation_id,
                    event_type = %event_type,
                    "ignoring unsupported event"
                );
                Ok(HandlerResult::Ignored)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use simba_core::domain::mood::{Mood, MoodId, ThreadKey};
    use simba_core::domain::user::SlackUserId;
    use simba_core::errors::{ApplicationError, DomainError, InterfaceError};

    use super::{
        parse_event, parse_interaction_form, parse_interaction_json, DispatchError, EventContext,
        EventRouter, HandlerResult, Interaction, InteractionKind, InteractionRouter,
        MoodInteractionService, PayloadError, SlackEvent, WorkspaceEventService,
    };
    use crate::action::{ModalMetadata, RawAction};

    #[derive(Default)]
    struct RecordingService {
        calls: Mutex<Vec<String>>,
        failures: Mutex<Vec<InterfaceError>>,
        fail_with: Option<ApplicationError>,
    }

    impl RecordingService {
        fn push(&self, call: String) -> Result<(), ApplicationError> {
            self.calls.lock().expect("calls lock").push(call);
            match &self.fail_with {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("calls lock").clone()
        }

        fn failures(&self) -> Vec<InterfaceError> {
            self.failures.lock().expect("failures lock").clone()
        }
    }

    #[async_trait]
    impl MoodInteractionService for RecordingService {
        async fn record_mood(
            &self,
            _interaction: &Interaction,
            mood: Mood,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("record:{mood}"))
        }

        async fn select_feeling(
            &self,
            _interaction: &Interaction,
            feeling: &str,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("feeling:{feeling}"))
        }

        async fn submit_context(
            &self,
            _interaction: &Interaction,
            mood_id: MoodId,
            context: &str,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("context:{mood_id}:{context}"))
        }

        async fn channel_selected(
            &self,
            _interaction: &Interaction,
            channel_id: &str,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("channel:{channel_id}"))
        }

        async fn send_kind_message(
            &self,
            _interaction: &Interaction,
            target_user_id: &str,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("kind:{target_user_id}"))
        }

        async fn notify_failure(&self, _interaction: &Interaction, error: &InterfaceError) {
            self.failures.lock().expect("failures lock").push(error.clone());
        }
    }

    #[async_trait]
    impl WorkspaceEventService for RecordingService {
        async fn app_home_opened(
            &self,
            user_id: &SlackUserId,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("home:{user_id}"))
        }

        async fn app_mention(
            &self,
            user_id: &SlackUserId,
            channel_id: &str,
            _ts: &str,
            _ctx: &EventContext,
        ) -> Result<(), ApplicationError> {
            self.push(format!("mention:{user_id}:{channel_id}"))
        }
    }

    fn interaction(actions: Vec<RawAction>) -> Interaction {
        Interaction {
            kind: InteractionKind::BlockActions,
            user_id: SlackUserId("U1".into()),
            user_name: Some("kitty".into()),
            channel_id: Some("C1".into()),
            message_ts: Some(ThreadKey("T1".into())),
            trigger_id: Some("trigger".into()),
            metadata: None,
            actions,
        }
    }

    fn ctx() -> EventContext {
        EventContext { correlation_id: "req-7".into() }
    }

    #[test]
    fn parses_block_actions_form_body() {
        let payload = concat!(
            r#"{"type":"block_actions","user":{"id":"U1","username":"kitty"},"trigger_id":"tr-1","#,
            r#""channel":{"id":"C1"},"#,
            r#""container":{"type":"message","message_ts":"1700000000.0001"},"#,
            r#""actions":[{"action_id":"mood_user_good_mood_1","value":"good_mood","#,
            r#""type":"button"}]}"#
        );
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", payload)
            .finish();

        let parsed = parse_interaction_form(body.as_bytes()).expect("parse");

        assert_eq!(parsed.kind, InteractionKind::BlockActions);
        assert_eq!(parsed.user_id, SlackUserId("U1".into()));
        assert_eq!(parsed.user_name.as_deref(), Some("kitty"));
        assert_eq!(parsed.channel_id.as_deref(), Some("C1"));
        assert_eq!(parsed.message_ts, Some(ThreadKey("1700000000.0001".into())));
        assert_eq!(parsed.trigger_id.as_deref(), Some("tr-1"));
        assert_eq!(parsed.actions, vec![RawAction::button("mood_user_good_mood_1", "good_mood")]);
    }

    #[test]
    fn parses_modal_feeling_select_with_metadata() {
        let payload = concat!(
            r#"{"type":"block_actions","user":{"id":"U1"},"#,
            r#""view":{"private_metadata":"T1::42","state":{"values":{}}},"#,
            r#""actions":[{"action_id":"mood_feeling_select_bad_mood_1","#,
            r#""selected_option":{"value":"Sad"}}]}"#
        );

        let parsed = parse_interaction_json(payload).expect("parse");

        assert_eq!(
            parsed.metadata,
            Some(ModalMetadata { thread: ThreadKey("T1".into()), mood_id: MoodId(42) })
        );
        assert_eq!(parsed.actions[0].selected_option.as_deref(), Some("Sad"));
        assert_eq!(parsed.channel_id, None);
    }

    #[test]
    fn view_submission_is_normalised_into_context_action() {
        let payload = concat!(
            r#"{"type":"view_submission","user":{"id":"U1"},"view":{"private_metadata":"T1::42","#,
            r#""state":{"values":{"MoodContext":{"mood_ctxt":"#,
            r#"{"type":"plain_text_input","value":"long day"}}}}}}"#
        );

        let parsed = parse_interaction_json(payload).expect("parse");

        assert_eq!(parsed.kind, InteractionKind::ViewSubmission);
        assert_eq!(parsed.actions.len(), 1);
        assert_eq!(parsed.actions[0].action_id, "mood_ctxt");
        assert_eq!(parsed.actions[0].value.as_deref(), Some("long day"));
    }

    #[test]
    fn rejects_missing_and_malformed_payloads() {
        assert_eq!(parse_interaction_form(b"foo=bar"), Err(PayloadError::MissingPayload));
        assert!(matches!(parse_interaction_json("{"), Err(PayloadError::Malformed(_))));
        assert!(matches!(
            parse_interaction_json(r#"{"type":"shortcut","user":{"id":"U1"}}"#),
            Err(PayloadError::Malformed(_))
        ));
    }

    #[test]
    fn parses_event_callbacks() {
        assert_eq!(
            parse_event(br#"{"type":"url_verification","challenge":"abc"}"#),
            Ok(SlackEvent::UrlVerification { challenge: "abc".into() })
        );
        let callback = |event: &str| format!(r#"{{"type":"event_callback","event":{event}}}"#);
        let home = r#"{"type":"app_home_opened","user":"U1","tab":"home"}"#;
        assert_eq!(
            parse_event(callback(home).as_bytes()),
            Ok(SlackEvent::AppHomeOpened { user_id: SlackUserId("U1".into()) })
        );
        assert_eq!(
            parse_event(
                callback(r#"{"type":"app_home_opened","user":"U1","tab":"messages"}"#).as_bytes()
            ),
            Ok(SlackEvent::Unsupported { event_type: "app_home_opened".into() })
        );
        let mention =
            r#"{"type":"app_mention","user":"U1","channel":"C1","ts":"1.0","text":"<@B> hi"}"#;
        assert_eq!(
            parse_event(callback(mention).as_bytes()),
            Ok(SlackEvent::AppMention {
                user_id: SlackUserId("U1".into()),
                channel_id: "C1".into(),
                ts: "1.0".into()
            })
        );
        assert_eq!(
            parse_event(br#"{"type":"app_rate_limited"}"#),
            Ok(SlackEvent::Unsupported { event_type: "unknown".into() })
        );
    }

    #[tokio::test]
    async fn router_sends_mood_clicks_to_record_mood() {
        let router = InteractionRouter::new(RecordingService::default());
        let request = interaction(vec![RawAction {
            action_id: "mood_user_good_mood_1700000000".into(),
            ..RawAction::default()
        }]);

        let result = router.dispatch(&request, &ctx()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Processed);
        assert_eq!(router.service().calls(), vec!["record:good_mood"]);
    }

    #[tokio::test]
    async fn unknown_action_is_reported_to_the_user() {
        let router = InteractionRouter::new(RecordingService::default());
        let request = interaction(vec![RawAction::button("unknown_action_xyz", "1")]);

        let error = router.dispatch(&request, &ctx()).await.expect_err("unknown action");

        assert_eq!(
            error,
            DispatchError::NoActionFound {
                action_id: "unknown_action_xyz".into(),
                value: "1".into()
            }
        );
        let failures = router.service().failures();
        assert_eq!(failures.len(), 1);
        assert!(matches!(
            &failures[0],
            InterfaceError::BadRequest { correlation_id, .. } if correlation_id == "req-7"
        ));
        assert!(router.service().calls().is_empty());
    }

    #[tokio::test]
    async fn service_failure_stops_the_batch_and_notifies() {
        let router = InteractionRouter::new(RecordingService {
            fail_with: Some(ApplicationError::NotFound("mood for thread T1".into())),
            ..RecordingService::default()
        });
        let request = interaction(vec![
            RawAction::button("mood_feeling_select_bad_mood_1", "Sad"),
            RawAction::button("mood_user_bad_mood_1", "bad_mood"),
        ]);

        let error = router.dispatch(&request, &ctx()).await.expect_err("service failure");

        assert!(matches!(error, DispatchError::Service(ApplicationError::NotFound(_))));
        assert_eq!(router.service().calls(), vec!["feeling:Sad"]);
        assert!(matches!(router.service().failures()[0], InterfaceError::NotFound { .. }));
    }

    #[tokio::test]
    async fn context_submission_uses_modal_metadata_and_skips_blank_text() {
        let router = InteractionRouter::new(RecordingService::default());
        let mut submitted = interaction(vec![RawAction::button("mood_ctxt", "long day")]);
        submitted.kind = InteractionKind::ViewSubmission;
        submitted.metadata =
            Some(ModalMetadata { thread: ThreadKey("T1".into()), mood_id: MoodId(42) });
        let mut blank = submitted.clone();
        blank.actions = vec![RawAction::button("mood_ctxt", "  ")];

        assert_eq!(router.dispatch(&submitted, &ctx()).await, Ok(HandlerResult::Processed));
        assert_eq!(router.dispatch(&blank, &ctx()).await, Ok(HandlerResult::Ignored));
        assert_eq!(router.service().calls(), vec!["context:42:long day"]);
    }

    #[tokio::test]
    async fn context_submission_without_metadata_is_a_payload_error() {
        let router = InteractionRouter::new(RecordingService::default());
        let request = interaction(vec![RawAction::button("mood_ctxt", "long day")]);

        let error = router.dispatch(&request, &ctx()).await.expect_err("missing metadata");

        assert!(matches!(error, DispatchError::Payload(_)));
        assert_eq!(router.service().failures().len(), 1);
    }

    #[tokio::test]
    async fn interaction_without_actions_is_ignored() {
        let router = InteractionRouter::new(RecordingService::default());

        let result = router.dispatch(&interaction(Vec::new()), &ctx()).await;

        assert_eq!(result, Ok(HandlerResult::Ignored));
    }

    #[tokio::test]
    async fn event_router_echoes_challenge_and_routes_callbacks() {
        let router = EventRouter::new(RecordingService::default());

        assert_eq!(
            router.dispatch(&SlackEvent::UrlVerification { challenge: "c".into() }, &ctx()).await,
            Ok(HandlerResult::Challenge("c".into()))
        );
        assert_eq!(
            router
                .dispatch(&SlackEvent::AppHomeOpened { user_id: SlackUserId("U1".into()) }, &ctx())
                .await,
            Ok(HandlerResult::Processed)
        );
        assert_eq!(
            router.dispatch(&SlackEvent::Unsupported { event_type: "x".into() }, &ctx()).await,
            Ok(HandlerResult::Ignored)
        );
        assert_eq!(router.service.calls(), vec!["home:U1"]);
    }
}
