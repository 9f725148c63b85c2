use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::warn;

use crate::api::ChatApi;
use crate::blocks;
use crate::commands::{parse_idea_command, CommandRouter, SlashCommandPayload};
use crate::submission::SubmissionService;
use crate::votes::ReactionVoteService;

use forkidea_core::parser;

/// Converts a Slack timestamp string (`"1723108800.000200"`) to whole Unix
/// seconds. Submission and correlation both truncate the same way, which is
/// what makes the exact-timestamp lookup line up.
pub fn parse_slack_ts(ts: &str) -> Option<i64> {
    let seconds = ts.split('.').next().unwrap_or(ts);
    seconds.parse::<i64>().ok()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    pub thread_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactionKind {
    Added,
    Removed,
}

impl ReactionKind {
    pub fn sign(&self) -> i64 {
        match self {
            Self::Added => 1,
            Self::Removed => -1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionEvent {
    pub reaction: String,
    /// The user who added or removed the reaction.
    pub reactor_user_id: String,
    /// `"message"` for message reactions; anything else is ignored.
    pub item_type: String,
    pub channel_id: String,
    pub message_ts: String,
    pub kind: ReactionKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventEnvelope {
    pub envelope_id: String,
    pub event: BotEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotEvent {
    SlashCommand(SlashCommandPayload),
    Message(MessageEvent),
    Reaction(ReactionEvent),
    Unsupported { event_type: String },
}

impl BotEvent {
    pub fn event_type(&self) -> BotEventType {
        match self {
            Self::SlashCommand(_) => BotEventType::SlashCommand,
            Self::Message(_) => BotEventType::Message,
            Self::Reaction(_) => BotEventType::Reaction,
            Self::Unsupported { .. } => BotEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BotEventType {
    SlashCommand,
    Message,
    Reaction,
    Unsupported,
}

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
    Processed,
    Ignored,
}

/// Domain failures (store, submission) are handled inside the handlers by
/// replying with an error card; the only failure that escapes to the socket
/// loop is being unable to deliver any reply at all.
#[derive(Debug, Error)]
pub enum EventHandlerError {
    #[error("response delivery failed: {0}")]
    Delivery(#[from] crate::api::ApiError),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> BotEventType;
    async fn handle(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<BotEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

/// Routes `/forkthisidea <command>` and always sends some ephemeral reply -
/// help, results, an invalid-command card, or an error card when the store
/// is unreachable.
pub struct SlashCommandHandler {
    router: CommandRouter,
    api: Arc<dyn ChatApi>,
}

impl SlashCommandHandler {
    pub fn new(router: CommandRouter, api: Arc<dyn ChatApi>) -> Self {
        Self { router, api }
    }
}

#[async_trait]
impl EventHandler for SlashCommandHandler {
    fn event_type(&self) -> BotEventType {
        BotEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command = parse_idea_command(&payload.text);
        let response = match self
            .router
            .route(command, &payload.user_id, Utc::now().timestamp())
            .await
        {
            Ok(response) => response,
            Err(error) => {
                warn!(
                    event_name = "command.route_failed",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %payload.channel_id,
                    user_id = %payload.user_id,
                    error = %error,
                    "command routing failed; replying with error card"
                );
                blocks::error_message(
                    "Something went wrong while handling your command. Please try again.",
                    &ctx.correlation_id,
                )
            }
        };

        self.api
            .send_ephemeral(
                &payload.channel_id,
                &payload.user_id,
                &response,
                payload.thread_ts.as_deref(),
            )
            .await?;

        Ok(HandlerResult::Processed)
    }
}

/// Feeds trigger-prefixed channel messages into the submission flow.
/// Non-trigger chatter is ignored.
pub struct MessageHandler {
    service: SubmissionService,
    api: Arc<dyn ChatApi>,
}

impl MessageHandler {
    pub fn new(service: SubmissionService, api: Arc<dyn ChatApi>) -> Self {
        Self { service, api }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn event_type(&self) -> BotEventType {
        BotEventType::Message
    }

    async fn handle(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        if !parser::is_idea_submission(&event.text) {
            return Ok(HandlerResult::Ignored);
        }

        if let Err(error) = self.service.handle_message(event).await {
            warn!(
                event_name = "submission.failed",
                correlation_id = %ctx.correlation_id,
                channel_id = %event.channel_id,
                user_id = %event.user_id,
                error = %error,
                "idea submission failed; replying with error card"
            );
            self.api
                .send_ephemeral(
                    &event.channel_id,
                    &event.user_id,
                    &blocks::error_message(
                        "Something went wrong while saving your idea. Please try again.",
                        &ctx.correlation_id,
                    ),
                    event.thread_ts.as_deref(),
                )
                .await?;
        }

        Ok(HandlerResult::Processed)
    }
}

/// Applies reaction votes. The vote service isolates every failure, so this
/// handler can never poison the event loop.
pub struct ReactionHandler {
    service: ReactionVoteService,
}

impl ReactionHandler {
    pub fn new(service: ReactionVoteService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for ReactionHandler {
    fn event_type(&self) -> BotEventType {
        BotEventType::Reaction
    }

    async fn handle(
        &self,
        envelope: &EventEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let BotEvent::Reaction(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.handle_reaction(event, ctx).await;
        Ok(HandlerResult::Processed)
    }
}
