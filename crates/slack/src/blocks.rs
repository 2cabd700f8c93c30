use chrono::{DateTime, Utc};
use serde::Serialize;

use simba_core::domain::mood::Mood;

use crate::action::{record_mood_action_id, send_kind_message_action_id};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String, emoji: bool },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into(), emoji: true }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain { text, .. } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OptionObject {
    pub text: TextObject,
    pub value: String,
}

impl OptionObject {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { text: TextObject::plain(label), value: value.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button(ButtonElement),
    StaticSelect {
        action_id: String,
        placeholder: TextObject,
        options: Vec<OptionObject>,
    },
    ChannelsSelect {
        action_id: String,
        placeholder: TextObject,
    },
    PlainTextInput {
        action_id: String,
        multiline: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
    },
}

impl Element {
    pub fn action_id(&self) -> &str {
        match self {
            Self::Button(button) => &button.action_id,
            Self::StaticSelect { action_id, .. }
            | Self::ChannelsSelect { action_id, .. }
            | Self::PlainTextInput { action_id, .. } => action_id,
        }
    }
}

impl From<ButtonElement> for Element {
    fn from(value: ButtonElement) -> Self {
        Self::Button(value)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        block_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Element>,
    },
    Actions {
        block_id: String,
        elements: Vec<Element>,
    },
    Context {
        block_id: String,
        elements: Vec<TextObject>,
    },
    Header {
        block_id: String,
        text: TextObject,
    },
    Divider {
        block_id: String,
    },
    Input {
        block_id: String,
        label: TextObject,
        element: Element,
        optional: bool,
    },
}

impl Block {
    pub fn block_id(&self) -> &str {
        match self {
            Self::Section { block_id, .. }
            | Self::Actions { block_id, .. }
            | Self::Context { block_id, .. }
            | Self::Header { block_id, .. }
            | Self::Divider { block_id }
            | Self::Input { block_id, .. } => block_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

/// Accumulates blocks for a message, modal or home tab.
pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(builder.build(block_id.into()));
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn context<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ContextBuilder),
    {
        let mut builder = ContextBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Context { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks
            .push(Block::Header { block_id: block_id.into(), text: TextObject::plain(text) });
        self
    }

    pub fn divider(mut self, block_id: impl Into<String>) -> Self {
        self.blocks.push(Block::Divider { block_id: block_id.into() });
        self
    }

    pub fn input(
        mut self,
        block_id: impl Into<String>,
        label: impl Into<String>,
        element: Element,
        optional: bool,
    ) -> Self {
        self.blocks.push(Block::Input {
            block_id: block_id.into(),
            label: TextObject::plain(label),
            element,
            optional,
        });
        self
    }

    /// Appends blocks built elsewhere, e.g. one group per user.
    pub fn extend(mut self, blocks: impl IntoIterator<Item = Block>) -> Self {
        self.blocks.extend(blocks);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
    fields: Vec<TextObject>,
    accessory: Option<Element>,
}

impl SectionBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = Some(TextObject::mrkdwn(text));
        self
    }

    pub fn field(&mut self, text: impl Into<String>) -> &mut Self {
        self.fields.push(TextObject::mrkdwn(text));
        self
    }

    pub fn accessory(&mut self, element: impl Into<Element>) -> &mut Self {
        self.accessory = Some(element.into());
        self
    }

    fn build(self, block_id: String) -> Block {
        // Slack rejects sections with neither text nor fields.
        let text = match (self.text, self.fields.is_empty()) {
            (None, true) => Some(TextObject::plain(" ")),
            (text, _) => text,
        };
        Block::Section { block_id, text, fields: self.fields, accessory: self.accessory }
    }
}

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<Element>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(Element::Button(button));
        self
    }

    pub fn element(&mut self, element: Element) -> &mut Self {
        self.elements.push(element);
        self
    }

    fn build(self) -> Vec<Element> {
        self.elements
    }
}

#[derive(Default)]
pub struct ContextBuilder {
    elements: Vec<TextObject>,
}

impl ContextBuilder {
    pub fn plain(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::plain(text));
        self
    }

    pub fn mrkdwn(&mut self, text: impl Into<String>) -> &mut Self {
        self.elements.push(TextObject::mrkdwn(text));
        self
    }

    fn build(self) -> Vec<TextObject> {
        self.elements
    }
}

pub const FALLBACK_QUOTE: &str = "Meow";
pub const FALLBACK_QUOTE_AUTHOR: &str = "Simba";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteOfTheDay {
    pub text: String,
    pub author: String,
}

impl Default for QuoteOfTheDay {
    fn default() -> Self {
        Self { text: FALLBACK_QUOTE.to_owned(), author: FALLBACK_QUOTE_AUTHOR.to_owned() }
    }
}

/// The most recent bad mood, shown so co-workers can reach out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LastBadMood {
    pub display_name: String,
    pub slack_user_id: String,
    pub recorded_at: DateTime<Utc>,
}

pub fn daily_prompt(
    quote: &QuoteOfTheDay,
    last_bad_mood: Option<&LastBadMood>,
    stamp_ms: i64,
) -> MessageTemplate {
    let mut builder = MessageBuilder::new("Hey folks! What is your mood today?")
        .section("mood.prompt.quote.v1", |section| {
            section.mrkdwn(format!(
                "Hey folks! What is your mood today:\nQuote of the Day: *{}*\nFrom {}",
                quote.text, quote.author
            ));
        })
        .actions("mood.prompt.moods.v1", |actions| {
            for mood in Mood::ALL {
                let action_id = record_mood_action_id(mood, stamp_ms);
                let button =
                    ButtonElement::new(action_id, mood.button_label()).value(mood.as_str());
                let button = match mood {
                    Mood::GoodMood => button.style(ButtonStyle::Primary),
                    Mood::AverageMood => button,
                    Mood::BadMood => button.style(ButtonStyle::Danger),
                };
                actions.button(button);
            }
        });

    if let Some(last) = last_bad_mood {
        builder = builder
            .divider("mood.prompt.divider.v1")
            .section("mood.prompt.last_bad.v1", |section| {
                section
                    .field(format!("*Last co-worker in bad mood:*\n{}", last.display_name))
                    .field(format!("*When:*\n{}", last.recorded_at.format("%A %d %B %Y")));
            })
            .actions("mood.prompt.kindness.v1", |actions| {
                let action_id = send_kind_message_action_id(stamp_ms);
                actions.button(
                    ButtonElement::new(action_id, "Send kind message :heart:")
                        .style(ButtonStyle::Danger)
                        .value(last.slack_user_id.clone()),
                );
            });
    }

    builder.build()
}

/// Direct message delivered by the "Send kind message" button.
pub fn kind_message(sender_name: &str, buzz_word: &str, gif_url: Option<&str>) -> MessageTemplate {
    let body = match gif_url {
        Some(url) => format!("{sender_name} thinks of you today :heart: *{buzz_word}*\n{url}"),
        None => format!("{sender_name} thinks of you today :heart: *{buzz_word}*"),
    };

    MessageBuilder::new(format!("{sender_name} sent you a kind message"))
        .section("mood.kindness.body.v1", |section| {
            section.mrkdwn(body);
        })
        .build()
}

pub fn mention_reply() -> MessageTemplate {
    MessageBuilder::new("Meow :cat:")
        .section("mood.mention.reply.v1", |section| {
            section.mrkdwn("Meow :cat:");
        })
        .build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("mood.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("mood.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}
