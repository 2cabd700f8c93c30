//! Decoding of interactive action identifiers into [`InteractionAction`].
//!
//! Identifiers carry a semantic prefix followed by a uniqueness suffix
//! (`mood_user_good_mood_1700000000`). Prefixes are tried in a fixed order and
//! the first match wins.

use thiserror::Error;

use simba_core::domain::mood::{Mood, MoodId, ThreadKey};
use simba_core::errors::DomainError;

pub const RECORD_MOOD_PREFIX: &str = "mood_user_";
pub const SELECT_FEELING_PREFIX: &str = "mood_feeling_select_";
pub const SUBMIT_CONTEXT_PREFIX: &str = "mood_ctxt";
pub const CHANNEL_SELECTED_PREFIX: &str = "channel_selected_";
pub const SEND_KIND_MESSAGE_PREFIX: &str = "send_kind_message_";

/// Block and action ids of the context field in the mood modal.
pub const CONTEXT_BLOCK_ID: &str = "MoodContext";
pub const CONTEXT_ACTION_ID: &str = "mood_ctxt";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ActionKind {
    SelectFeeling,
    RecordMood,
    SubmitContext,
    SendKindMessage,
    ChannelSelected,
}

const ROUTES: &[(&str, ActionKind)] = &[
    (SELECT_FEELING_PREFIX, ActionKind::SelectFeeling),
    (RECORD_MOOD_PREFIX, ActionKind::RecordMood),
    (SUBMIT_CONTEXT_PREFIX, ActionKind::SubmitContext),
    (SEND_KIND_MESSAGE_PREFIX, ActionKind::SendKindMessage),
    (CHANNEL_SELECTED_PREFIX, ActionKind::ChannelSelected),
];

/// One action as it arrives from Slack, before decoding.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawAction {
    pub action_id: String,
    pub value: Option<String>,
    pub selected_option: Option<String>,
    pub selected_channel: Option<String>,
}

impl RawAction {
    pub fn button(action_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { action_id: action_id.into(), value: Some(value.into()), ..Self::default() }
    }

    /// Payload value regardless of which element produced it.
    pub fn payload(&self) -> &str {
        self.value
            .as_deref()
            .or(self.selected_option.as_deref())
            .or(self.selected_channel.as_deref())
            .unwrap_or("")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InteractionAction {
    RecordMood { mood: Mood },
    SelectFeeling { feeling: String },
    SubmitContext { context: String },
    ChannelSelected { channel_id: String },
    SendKindMessage { target_user_id: String },
}

impl InteractionAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RecordMood { .. } => "record_mood",
            Self::SelectFeeling { .. } => "select_feeling",
            Self::SubmitContext { .. } => "submit_context",
            Self::ChannelSelected { .. } => "channel_selected",
            Self::SendKindMessage { .. } => "send_kind_message",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionDecodeError {
    #[error("ActionId({action_id}) = {value} is not registered")]
    NoActionFound { action_id: String, value: String },
    #[error("action `{action_id}` carries an invalid value: {source}")]
    InvalidValue { action_id: String, source: DomainError },
}

pub fn decode_action(raw: &RawAction) -> Result<InteractionAction, ActionDecodeError> {
    let Some((prefix, kind)) =
        ROUTES.iter().find(|(prefix, _)| raw.action_id.starts_with(prefix)).copied()
    else {
        return Err(ActionDecodeError::NoActionFound {
            action_id: raw.action_id.clone(),
            value: raw.payload().to_string(),
        });
    };

    let action = match kind {
        ActionKind::RecordMood => {
            let mood = mood_from_value_or_suffix(raw, prefix).map_err(|source| {
                ActionDecodeError::InvalidValue { action_id: raw.action_id.clone(), source }
            })?;
            InteractionAction::RecordMood { mood }
        }
        ActionKind::SelectFeeling => {
            InteractionAction::SelectFeeling { feeling: raw.payload().to_string() }
        }
        ActionKind::SubmitContext => {
            InteractionAction::SubmitContext { context: raw.payload().to_string() }
        }
        ActionKind::ChannelSelected => {
            InteractionAction::ChannelSelected { channel_id: raw.payload().to_string() }
        }
        ActionKind::SendKindMessage => {
            InteractionAction::SendKindMessage { target_user_id: raw.payload().to_string() }
        }
    };

    Ok(action)
}

/// Button value first, then the id suffix with its trailing `_<digits>` stamp removed.
fn mood_from_value_or_suffix(raw: &RawAction, prefix: &str) -> Result<Mood, DomainError> {
    if let Some(value) = raw.value.as_deref().filter(|value| !value.trim().is_empty()) {
        return value.parse();
    }

    let suffix = &raw.action_id[prefix.len()..];
    let name = match suffix.rsplit_once('_') {
        Some((name, stamp)) if !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()) => {
            name
        }
        _ => suffix,
    };
    name.parse()
}

pub fn record_mood_action_id(mood: Mood, stamp_ms: i64) -> String {
    format!("{RECORD_MOOD_PREFIX}{}_{stamp_ms}", mood.as_str())
}

pub fn select_feeling_action_id(mood: Mood, stamp_ms: i64) -> String {
    format!("{SELECT_FEELING_PREFIX}{}_{stamp_ms}", mood.as_str())
}

pub fn channel_selected_action_id(stamp_ms: i64) -> String {
    format!("{CHANNEL_SELECTED_PREFIX}{stamp_ms}")
}

pub fn send_kind_message_action_id(stamp_ms: i64) -> String {
    format!("{SEND_KIND_MESSAGE_PREFIX}{stamp_ms}")
}

/// Correlation data carried through the mood modal as `{thread}::{mood_id}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalMetadata {
    pub thread: ThreadKey,
    pub mood_id: MoodId,
}

impl ModalMetadata {
    pub fn encode(&self) -> String {
        format!("{}::{}", self.thread, self.mood_id)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let (thread, mood_id) = raw.split_once("::")?;
        let mood_id = mood_id.parse::<MoodId>().ok()?;
        Some(Self { thread: ThreadKey(thread.to_string()), mood_id })
    }
}
