//! Modal and home-tab views.

use std::collections::BTreeMap;

use serde::Serialize;

use simba_core::aggregate::count_by_category;
use simba_core::domain::mood::{DailyMood, Mood};

use crate::action::{
    channel_selected_action_id, select_feeling_action_id, send_kind_message_action_id,
    ModalMetadata, CONTEXT_ACTION_ID, CONTEXT_BLOCK_ID,
};
use crate::blocks::{
    Block, ButtonElement, Element, MessageBuilder, OptionObject, TextObject,
};

pub const MOOD_MODAL_CALLBACK_ID: &str = "mood_context";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum View {
    Modal {
        callback_id: String,
        title: TextObject,
        submit: TextObject,
        close: TextObject,
        private_metadata: String,
        blocks: Vec<Block>,
    },
    Home {
        blocks: Vec<Block>,
    },
}

impl View {
    pub fn blocks(&self) -> &[Block] {
        match self {
            Self::Modal { blocks, .. } | Self::Home { blocks } => blocks,
        }
    }
}

/// Follow-up modal opened after a mood pick: feeling select and free-form context.
pub fn mood_modal(
    display_name: &str,
    mood: Mood,
    metadata: &ModalMetadata,
    stamp_ms: i64,
) -> View {
    let options =
        mood.feelings().iter().map(|feeling| OptionObject::new(*feeling, *feeling)).collect();
    let message = MessageBuilder::new("How do you feel?")
        .section("mood.modal.greeting.v1", |section| {
            section.mrkdwn(format!(
                "Hi {display_name}, you are in a *{}* {} today.",
                mood.label(),
                mood.smiley()
            ));
        })
        .actions("mood.modal.feeling.v1", |actions| {
            actions.element(Element::StaticSelect {
                action_id: select_feeling_action_id(mood, stamp_ms),
                placeholder: TextObject::plain("How do you feel?"),
                options,
            });
        })
        .input(
            CONTEXT_BLOCK_ID,
            "Anything you want to share?",
            Element::PlainTextInput {
                action_id: CONTEXT_ACTION_ID.to_owned(),
                multiline: true,
                placeholder: Some(TextObject::plain("Tell us more")),
            },
            true,
        )
        .build();

    View::Modal {
        callback_id: MOOD_MODAL_CALLBACK_ID.to_owned(),
        title: TextObject::plain("Simba"),
        submit: TextObject::plain("Send"),
        close: TextObject::plain("Close"),
        private_metadata: metadata.encode(),
        blocks: message.blocks,
    }
}

pub fn individual_home(recent: &[DailyMood]) -> View {
    let counts = count_by_category(recent);
    let builder = MessageBuilder::new("Simba")
        .header("home.individual.header.v1", "Simba Application (Not Admin)");

    let builder = if counts.is_empty() {
        builder.section("home.individual.empty.v1", |section| {
            section.plain("No mood recorded yet. Answer the next daily prompt!");
        })
    } else {
        let lines = counts
            .iter()
            .map(|(mood, count)| {
                format!("You've been {count} in {} {}", mood.label(), mood.smiley())
            })
            .collect::<Vec<_>>()
            .join("\n");
        builder.section("home.individual.summary.v1", |section| {
            section.mrkdwn(lines);
        })
    };

    View::Home { blocks: builder.build().blocks }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelMember {
    pub slack_user_id: String,
    pub display_name: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ManagerDashboard {
    pub global: BTreeMap<Mood, f64>,
    pub per_user: BTreeMap<String, BTreeMap<Mood, f64>>,
    pub channel_members: Option<Vec<ChannelMember>>,
}

pub fn manager_home(dashboard: &ManagerDashboard, stamp_ms: i64) -> View {
    let mut builder = MessageBuilder::new("Simba")
        .header("home.manager.header.v1", "Simba Application (Admin)")
        .section("home.manager.week.v1", |section| {
            section.mrkdwn("*Week informations*");
        });

    builder = if dashboard.global.is_empty() {
        builder.section("home.manager.global.empty.v1", |section| {
            section.plain("No mood recorded in the last two weeks.");
        })
    } else {
        let global = percentage_lines(&dashboard.global);
        builder.section("home.manager.global.v1", |section| {
            section.mrkdwn(global);
        })
    };

    builder = builder.divider("home.manager.divider.users.v1").extend(
        dashboard.per_user.iter().enumerate().flat_map(|(index, (username, breakdown))| {
            [
                Block::Header {
                    block_id: format!("home.manager.user.{index}.header.v1"),
                    text: TextObject::plain(username.clone()),
                },
                Block::Section {
                    block_id: format!("home.manager.user.{index}.moods.v1"),
                    text: Some(TextObject::mrkdwn(percentage_lines(breakdown))),
                    fields: Vec::new(),
                    accessory: None,
                },
            ]
        }),
    );

    builder = builder.divider("home.manager.divider.channel.v1").section(
        "home.manager.channel.v1",
        |section| {
            section.mrkdwn("*Pick a channel to list its members*").accessory(
                Element::ChannelsSelect {
                    action_id: channel_selected_action_id(stamp_ms),
                    placeholder: TextObject::plain("Select a channel"),
                },
            );
        },
    );

    if let Some(members) = &dashboard.channel_members {
        builder = builder.extend(members.iter().enumerate().map(|(index, member)| Block::Section {
            block_id: format!("home.manager.member.{index}.v1"),
            text: Some(TextObject::mrkdwn(member.display_name.clone())),
            fields: Vec::new(),
            accessory: Some(Element::Button(
                ButtonElement::new(
                    format!("{}_{index}", send_kind_message_action_id(stamp_ms)),
                    "Send kind message :heart:",
                )
                .value(member.slack_user_id.clone()),
            )),
        }));
    }

    View::Home { blocks: builder.build().blocks }
}

fn percentage_lines(breakdown: &BTreeMap<Mood, f64>) -> String {
    breakdown
        .iter()
        .map(|(mood, percent)| format!("{} {percent:.2}%", mood.smiley()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use simba_core::domain::mood::{DailyMood, Mood, MoodId, ThreadKey};
    use simba_core::domain::user::UserId;

    use super::{individual_home, manager_home, mood_modal, ChannelMember, ManagerDashboard, View};
    use crate::action::{decode_action, InteractionAction, ModalMetadata, RawAction};
    use crate::blocks::{Block, Element, TextObject};

    fn entry(id: i64, mood: Mood) -> DailyMood {
        DailyMood {
            id: MoodId(id),
            user_id: UserId(1),
            mood,
            feeling: None,
            context: None,
            thread_ts: ThreadKey(format!("T{id}")),
            created_at: Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).single().expect("date"),
        }
    }

    #[test]
    fn mood_modal_carries_metadata_and_feeling_options() {
        let metadata = ModalMetadata { thread: ThreadKey("1.0".into()), mood_id: MoodId(3) };
        let view = mood_modal("Nala", Mood::BadMood, &metadata, 8);

        let View::Modal { private_metadata, blocks, .. } = &view else {
            panic!("expected modal");
        };
        assert_eq!(private_metadata, "1.0::3");

        let Block::Actions { elements, .. } = &blocks[1] else {
            panic!("expected feeling select");
        };
        let Element::StaticSelect { action_id, options, .. } = &elements[0] else {
            panic!("expected static select");
        };
        assert_eq!(options.len(), Mood::BadMood.feelings().len());
        let raw = RawAction {
            action_id: action_id.clone(),
            selected_option: Some(options[0].value.clone()),
            ..RawAction::default()
        };
        assert_eq!(
            decode_action(&raw),
            Ok(InteractionAction::SelectFeeling { feeling: "Sad".into() })
        );

        assert!(matches!(
            &blocks[2],
            Block::Input { block_id, optional: true, .. } if block_id == "MoodContext"
        ));
    }

    #[test]
    fn modal_serializes_as_slack_view() {
        let metadata = ModalMetadata { thread: ThreadKey("1.0".into()), mood_id: MoodId(3) };
        let modal = mood_modal("Nala", Mood::GoodMood, &metadata, 8);
        let value = serde_json::to_value(modal).expect("serialize");

        assert_eq!(value["type"], "modal");
        assert_eq!(value["title"]["type"], "plain_text");
        assert_eq!(value["blocks"][2]["element"]["type"], "plain_text_input");
    }

    #[test]
    fn individual_home_counts_recent_moods() {
        let view = individual_home(&[
            entry(1, Mood::GoodMood),
            entry(2, Mood::GoodMood),
            entry(3, Mood::BadMood),
        ]);

        assert!(matches!(
            &view.blocks()[1],
            Block::Section { text: Some(TextObject::Mrkdwn { text }), .. }
                if text == "You've been 2 in good mood :smile:\nYou've been 1 in bad mood :rage:"
        ));
    }

    #[test]
    fn individual_home_without_moods_renders_placeholder() {
        let view = individual_home(&[]);

        assert!(matches!(
            &view.blocks()[1],
            Block::Section { block_id, .. } if block_id == "home.individual.empty.v1"
        ));
    }

    #[test]
    fn manager_home_lists_users_and_channel_members() {
        let dashboard = ManagerDashboard {
            global: BTreeMap::from([(Mood::GoodMood, 25.0), (Mood::BadMood, 75.0)]),
            per_user: BTreeMap::from([(
                "alice".to_string(),
                BTreeMap::from([(Mood::GoodMood, 100.0)]),
            )]),
            channel_members: Some(vec![ChannelMember {
                slack_user_id: "U2".into(),
                display_name: "Bob".into(),
            }]),
        };

        let view = manager_home(&dashboard, 11);
        let blocks = view.blocks();

        assert!(matches!(
            &blocks[2],
            Block::Section { text: Some(text), .. }
                if text.text() == ":smile: 25.00%\n:rage: 75.00%"
        ));
        assert!(matches!(&blocks[4], Block::Header { text, .. } if text.text() == "alice"));
        let Some(Block::Section { accessory: Some(Element::Button(button)), .. }) = blocks.last()
        else {
            panic!("expected member row");
        };
        assert_eq!(button.value.as_deref(), Some("U2"));
        assert!(matches!(
            decode_action(&RawAction::button(button.action_id.clone(), "U2")),
            Ok(InteractionAction::SendKindMessage { .. })
        ));
    }
}
