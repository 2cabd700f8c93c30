//! Slack integration for simba.
//!
//! - **Actions** (`action`) - action-id decoding into [`action::InteractionAction`]
//! - **Events** (`events`) - payload decoding, interaction and event routers
//! - **Block Kit** (`blocks`, `views`) - daily prompt, mood modal, home tabs
//! - **Signature** (`signature`) - `X-Slack-Signature` verification
//! - **Client** (`client`) - outbound Web API behind the [`client::SlackApi`] trait
//!
//! # Architecture
//!
//! ```text
//! HTTP body → parse_interaction_form → InteractionRouter → MoodInteractionService → MoodLedger
//!                                             ↓
//!                                 SlackApi ← Block Kit views
//! ```

pub mod action;
pub mod blocks;
pub mod client;
pub mod events;
pub mod signature;
pub mod views;

pub use action::{decode_action, ActionDecodeError, InteractionAction, ModalMetadata, RawAction};
pub use client::{HttpSlackClient, SlackApi, SlackApiError, SlackProfile};
pub use events::{
    parse_event, parse_interaction_form, DispatchError, EventContext, EventRouter, HandlerResult,
    Interaction, InteractionKind, InteractionRouter, MoodInteractionService, PayloadError,
    SlackEvent, WorkspaceEventService,
};
pub use signature::{SignatureError, SignatureVerifier};
