use chrono::{TimeZone, Utc};
use serde::Serialize;

use forkidea_core::domain::idea::Idea;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    #[serde(rename = "plain_text")]
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    #[serde(rename = "type")]
    pub element_type: &'static str,
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            element_type: "button",
            action_id: action_id.into(),
            text: TextObject::plain(label),
            value: None,
            url: None,
        }
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Header { block_id: String, text: TextObject },
    Section { block_id: String, text: TextObject },
    Context { block_id: String, elements: Vec<TextObject> },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Divider,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn header(mut self, block_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.blocks.push(Block::Header {
            block_id: block_id.into(),
            text: TextObject::plain(text),
        });
        self
    }

    pub fn section<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut SectionBuilder),
    {
        let mut builder = SectionBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Section { block_id: block_id.into(), text: builder.build() });
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

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut ActionsBuilder),
    {
        let mut builder = ActionsBuilder::default();
        build(&mut builder);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements: builder.build() });
        self
    }

    pub fn divider(mut self) -> Self {
        self.blocks.push(Block::Divider);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

#[derive(Default)]
pub struct SectionBuilder {
    text: Option<TextObject>,
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

    fn build(self) -> TextObject {
        self.text.unwrap_or_else(|| TextObject::plain(""))
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

#[derive(Default)]
pub struct ActionsBuilder {
    elements: Vec<ButtonElement>,
}

impl ActionsBuilder {
    pub fn button(&mut self, button: ButtonElement) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<ButtonElement> {
        self.elements
    }
}

/// A plain one-section message, used for sentence-shaped replies such as
/// the count responses.
pub fn text_message(text: impl Into<String>) -> MessageTemplate {
    let text = text.into();
    MessageBuilder::new(text.clone())
        .section("idea.text.v1", |section| {
            section.mrkdwn(text);
        })
        .build()
}

pub fn help_message(user_id: &str) -> MessageTemplate {
    MessageBuilder::new("Fork This Idea - Help")
        .header("idea.help.header.v1", "Fork This Idea - Help")
        .section("idea.help.greeting.v1", |section| {
            section.mrkdwn(format!("Hello <@{user_id}>! Here are the available commands:"));
        })
        .section("idea.help.submit.v1", |section| {
            section.mrkdwn(
                "*Submit an idea:*\n`PI: <title> | <description>`\nYou can use `Pi:` and `pi:` as well.",
            );
        })
        .section("idea.help.fetch.v1", |section| {
            section.mrkdwn(
                "*Fetch ideas:*\n`/forkthisidea fetch [today|all|me|@user]`\nRetrieve ideas by different criteria.",
            );
        })
        .section("idea.help.count.v1", |section| {
            section.mrkdwn(
                "*Count ideas:*\n`/forkthisidea count [me|@user]`\nCount ideas for yourself or others.",
            );
        })
        .section("idea.help.example.v1", |section| {
            section.mrkdwn("*Example:*\n`PI: My Idea | This is a description of my idea.`");
        })
        .context("idea.help.footer.v1", |context| {
            context.mrkdwn("Ever need help? Type `/forkthisidea help`");
        })
        .build()
}

pub fn invalid_command_message(user_id: &str) -> MessageTemplate {
    MessageBuilder::new("Invalid command")
        .section("idea.invalid_command.v1", |section| {
            section.mrkdwn(format!(
                "Hi <@{user_id}>! That was an invalid command. Please use one of the following commands:\n\
                 - `/forkthisidea fetch [today|all|me|@user]`: Fetch ideas by different criteria\n\
                 - `/forkthisidea count [me|@user]`: Count ideas for yourself or others\n\
                 - `/forkthisidea help`: See detailed help information\n\
                 Type `/forkthisidea help` for more information."
            ));
        })
        .build()
}

pub fn empty_submission_message(user_id: &str) -> MessageTemplate {
    text_message(format!("Hello <@{user_id}>! Please provide an idea with your command."))
}

pub fn submission_received_message(user_id: &str) -> MessageTemplate {
    text_message(format!("Thank you <@{user_id}>! Your idea has been submitted."))
}

pub fn submission_announcement(
    user_id: &str,
    title: &str,
    description: &str,
    submitted_at: i64,
) -> MessageTemplate {
    text_message(format!(
        "<@{user_id}> submitted an idea *{title}: {description}* at {}",
        format_utc_timestamp(submitted_at)
    ))
}

/// Renders a run of idea cards, newest first as handed in. Each card is a
/// header/section/context/actions/divider block run keyed by the idea id.
pub fn idea_feed_message(ideas: &[Idea]) -> MessageTemplate {
    if ideas.is_empty() {
        return MessageBuilder::new("No ideas found")
            .section("idea.feed.empty.v1", |section| {
                section.plain("No ideas have been submitted yet.");
            })
            .build();
    }

    let mut builder = MessageBuilder::new(format!("{} ideas", ideas.len()));
    for idea in ideas {
        let id = &idea.id.0;
        builder = builder
            .header(format!("idea.card.header.{id}"), &idea.title)
            .section(format!("idea.card.body.{id}"), |section| {
                section.mrkdwn(if idea.description.is_empty() {
                    "_No description provided._".to_string()
                } else {
                    idea.description.clone()
                });
            })
            .context(format!("idea.card.meta.{id}"), |context| {
                context.mrkdwn(format!(
                    "Submitted by <@{}> on {} with {} upvotes and {} downvotes",
                    idea.user_id,
                    format_utc_timestamp(idea.submitted_at),
                    idea.votes.upvotes,
                    idea.votes.downvotes
                ));
            })
            .actions(format!("idea.card.actions.{id}"), |actions| {
                actions.button(ButtonElement::new("idea.open.v1", "Open").value(id.clone()));
            })
            .divider();
    }
    builder.build()
}

pub fn error_message(summary: &str, correlation_id: &str) -> MessageTemplate {
    MessageBuilder::new(summary.to_owned())
        .section("idea.error.summary.v1", |section| {
            section.mrkdwn(format!(":warning: {summary}"));
        })
        .context("idea.error.context.v1", |context| {
            context.plain(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

fn format_utc_timestamp(unix_secs: i64) -> String {
    match Utc.timestamp_opt(unix_secs, 0).single() {
        Some(moment) => moment.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => format!("timestamp {unix_secs}"),
    }
}
