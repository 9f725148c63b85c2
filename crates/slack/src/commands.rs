use std::sync::Arc;

use thiserror::Error;

use forkidea_core::domain::idea::Idea;
use forkidea_db::repositories::{IdeaRepository, RepositoryError};

use crate::blocks::{self, MessageTemplate};

/// How many ideas a fetch renders, newest first.
pub const FETCH_LIMIT: usize = 5;

/// `fetch today` covers the trailing 24 hours.
pub const TODAY_WINDOW_SECS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub command: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
    pub trigger_ts: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdeaCommand {
    Fetch(FetchScope),
    Count(CountScope),
    Help,
    Invalid,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchScope {
    Today,
    All,
    Mine,
    User(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CountScope {
    All,
    Mine,
    User(String),
}

#[derive(Debug, Error)]
pub enum CommandRouteError {
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Parses the slash-command text into a command. Verbs and keyword
/// subcommands are case-insensitive; mention subcommands keep their case
/// because user ids are case-sensitive.
pub fn parse_idea_command(text: &str) -> IdeaCommand {
    let mut parts = text.split_whitespace();
    let Some(verb) = parts.next() else {
        return IdeaCommand::Invalid;
    };
    let subcommand = parts.next().unwrap_or("");

    match verb.to_ascii_lowercase().as_str() {
        "fetch" => match subcommand.to_ascii_lowercase().as_str() {
            "today" => IdeaCommand::Fetch(FetchScope::Today),
            "all" => IdeaCommand::Fetch(FetchScope::All),
            "me" => IdeaCommand::Fetch(FetchScope::Mine),
            _ => match parse_mention(subcommand) {
                Some(user_id) => IdeaCommand::Fetch(FetchScope::User(user_id)),
                None => IdeaCommand::Invalid,
            },
        },
        "count" => match subcommand.to_ascii_lowercase().as_str() {
            "" => IdeaCommand::Count(CountScope::All),
            "me" => IdeaCommand::Count(CountScope::Mine),
            _ => match parse_mention(subcommand) {
                Some(user_id) => IdeaCommand::Count(CountScope::User(user_id)),
                None => IdeaCommand::Invalid,
            },
        },
        "help" => IdeaCommand::Help,
        _ => IdeaCommand::Invalid,
    }
}

/// Extracts the user id from a `<@U123>` or `<@U123|handle>` mention token.
pub fn parse_mention(token: &str) -> Option<String> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let user_id = inner.split('|').next().unwrap_or(inner);
    (!user_id.is_empty()).then(|| user_id.to_owned())
}

/// Stateless dispatch over the command table. Every route produces a
/// user-visible message; store access happens only for the routes that
/// need it.
pub struct CommandRouter {
    store: Arc<dyn IdeaRepository>,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn IdeaRepository>) -> Self {
        Self { store }
    }

    pub async fn route(
        &self,
        command: IdeaCommand,
        acting_user_id: &str,
        now: i64,
    ) -> Result<MessageTemplate, CommandRouteError> {
        match command {
            IdeaCommand::Fetch(scope) => {
                let ideas = match scope {
                    FetchScope::Today => {
                        self.store.list_by_time_range(now - TODAY_WINDOW_SECS, now).await?
                    }
                    FetchScope::All => self.store.list_all().await?,
                    FetchScope::Mine => self.store.list_by_user(acting_user_id).await?,
                    FetchScope::User(user_id) => self.store.list_by_user(&user_id).await?,
                };
                let ideas = sort_and_limit(ideas, FETCH_LIMIT);
                Ok(blocks::idea_feed_message(&ideas))
            }
            IdeaCommand::Count(scope) => {
                let sentence = match scope {
                    CountScope::All => {
                        let count = self.store.count(None).await?;
                        format!("There are a total of {count} ideas submitted.")
                    }
                    CountScope::Mine => {
                        let count = self.store.count(Some(acting_user_id)).await?;
                        format!("You have submitted {count} ideas.")
                    }
                    CountScope::User(user_id) => {
                        let count = self.store.count(Some(&user_id)).await?;
                        format!("<@{user_id}> has submitted {count} ideas.")
                    }
                };
                Ok(blocks::text_message(sentence))
            }
            IdeaCommand::Help => Ok(blocks::help_message(acting_user_id)),
            IdeaCommand::Invalid => Ok(blocks::invalid_command_message(acting_user_id)),
        }
    }
}

fn sort_and_limit(mut ideas: Vec<Idea>, limit: usize) -> Vec<Idea> {
    ideas.sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
    ideas.truncate(limit);
    ideas
}
