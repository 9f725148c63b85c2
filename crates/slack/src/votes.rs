//! Reaction-to-vote aggregation.
//!
//! Reaction events carry only a channel and a message timestamp, never an
//! idea id, so applying a vote means re-finding the idea: fetch the reacted-to
//! message back from Slack, check that it is a submission, look the idea up by
//! the exact stored timestamp, and re-verify author and content before
//! touching the tally. The timestamp heuristic lives behind
//! `find_idea_for_message` so it can be swapped for a real id join if the
//! platform ever exposes one.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use forkidea_core::domain::idea::{Idea, IdeaId, VoteDelta, VoteUpdate};
use forkidea_core::parser;
use forkidea_db::repositories::{IdeaRepository, RepositoryError};

use crate::api::{ApiError, ChatApi};
use crate::events::{parse_slack_ts, EventContext, ReactionEvent};

/// Reaction names that count as upvotes. Slack reports the thumbs emoji as
/// `+1`, custom workspace emoji by their registered names.
pub const UPVOTE_REACTIONS: &[&str] = &[
    "thumbsup",
    "+1",
    "heart",
    "saluting_face",
    "star",
    "upvote",
    "double-upvote",
    "upvote5",
    "upvote3",
    "8bit-upvote",
    "super-mega-upvote",
];

/// Reaction names that count as downvotes. Disjoint from the upvote set.
pub const DOWNVOTE_REACTIONS: &[&str] = &[
    "thumbsdown",
    "-1",
    "downvote",
    "downdoot",
    "downvote2",
    "downvote3",
    "downvotex",
    "downvote-red",
    "double-downvote",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteKind {
    Up,
    Down,
}

pub fn classify_reaction(reaction: &str) -> Option<VoteKind> {
    let normalized = normalize_reaction_token(reaction);
    if UPVOTE_REACTIONS.contains(&normalized.as_str()) {
        Some(VoteKind::Up)
    } else if DOWNVOTE_REACTIONS.contains(&normalized.as_str()) {
        Some(VoteKind::Down)
    } else {
        None
    }
}

fn normalize_reaction_token(reaction: &str) -> String {
    reaction.trim().trim_matches(':').to_ascii_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Applied { idea_id: IdeaId, kind: VoteKind, sign: i64 },
    Ignored(IgnoreReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The reaction is in neither vote set.
    UnrelatedReaction,
    /// The reaction was on something other than a message.
    NotAMessage,
    /// The platform no longer has a message at that timestamp.
    MessageMissing,
    /// The reacted-to message is not an idea submission.
    NotASubmission,
    /// The message timestamp could not be read as Unix seconds.
    UnreadableTimestamp,
    /// No stored idea carries the message's exact timestamp.
    NoIdeaMatched,
    /// The matched idea was submitted by someone other than the message
    /// author - a correlation mismatch.
    AuthorMismatch,
    /// Re-parsing the message text did not reproduce the stored title and
    /// description - a correlation mismatch.
    ContentMismatch,
    /// The idea disappeared between lookup and update.
    IdeaVanished,
}

impl IgnoreReason {
    fn is_correlation_mismatch(&self) -> bool {
        matches!(self, Self::AuthorMismatch | Self::ContentMismatch)
    }
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("message lookup failed: {0}")]
    MessageLookup(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

pub struct ReactionVoteService {
    store: Arc<dyn IdeaRepository>,
    api: Arc<dyn ChatApi>,
}

impl ReactionVoteService {
    pub fn new(store: Arc<dyn IdeaRepository>, api: Arc<dyn ChatApi>) -> Self {
        Self { store, api }
    }

    /// Applies the reaction as a vote. Every failure is logged and swallowed
    /// here - reaction handling must never unwind into the event loop.
    pub async fn handle_reaction(&self, event: &ReactionEvent, ctx: &EventContext) {
        match self.apply_vote(event).await {
            Ok(VoteOutcome::Applied { idea_id, kind, sign }) => {
                debug!(
                    event_name = "vote.applied",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %event.channel_id,
                    user_id = %event.reactor_user_id,
                    idea_id = %idea_id.0,
                    kind = ?kind,
                    sign,
                    "reaction vote applied"
                );
            }
            Ok(VoteOutcome::Ignored(reason)) if reason.is_correlation_mismatch() => {
                warn!(
                    event_name = "vote.correlation_mismatch",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %event.channel_id,
                    message_ts = %event.message_ts,
                    reason = ?reason,
                    "reaction matched an idea that fails verification; ignoring"
                );
            }
            Ok(VoteOutcome::Ignored(reason)) => {
                debug!(
                    event_name = "vote.ignored",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %event.channel_id,
                    message_ts = %event.message_ts,
                    reason = ?reason,
                    "reaction ignored"
                );
            }
            Err(error) => {
                warn!(
                    event_name = "vote.failed",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %event.channel_id,
                    message_ts = %event.message_ts,
                    error = %error,
                    "reaction handling failed; continuing event loop"
                );
            }
        }
    }

    /// The fallible pipeline behind `handle_reaction`, separated so tests can
    /// observe outcomes directly.
    pub async fn apply_vote(&self, event: &ReactionEvent) -> Result<VoteOutcome, VoteError> {
        if event.item_type != "message" {
            return Ok(VoteOutcome::Ignored(IgnoreReason::NotAMessage));
        }

        let Some(kind) = classify_reaction(&event.reaction) else {
            return Ok(VoteOutcome::Ignored(IgnoreReason::UnrelatedReaction));
        };

        let sign = event.kind.sign();

        let Some(message) =
            self.api.fetch_message(&event.channel_id, &event.message_ts).await?
        else {
            return Ok(VoteOutcome::Ignored(IgnoreReason::MessageMissing));
        };

        if !parser::is_idea_submission(&message.text) {
            return Ok(VoteOutcome::Ignored(IgnoreReason::NotASubmission));
        }

        let Some(submitted_at) = parse_slack_ts(&message.ts) else {
            return Ok(VoteOutcome::Ignored(IgnoreReason::UnreadableTimestamp));
        };

        let Some(idea) = self.find_idea_for_message(&event.channel_id, submitted_at).await?
        else {
            return Ok(VoteOutcome::Ignored(IgnoreReason::NoIdeaMatched));
        };

        if idea.user_id != message.user_id {
            return Ok(VoteOutcome::Ignored(IgnoreReason::AuthorMismatch));
        }
        if parser::parse_idea_text(&message.text) != (idea.title.clone(), idea.description.clone())
        {
            return Ok(VoteOutcome::Ignored(IgnoreReason::ContentMismatch));
        }

        let delta = match kind {
            VoteKind::Up => VoteDelta::upvote(sign),
            VoteKind::Down => VoteDelta::downvote(sign),
        };

        if !self.store.update_votes(&idea.id, VoteUpdate::Delta(delta)).await? {
            return Ok(VoteOutcome::Ignored(IgnoreReason::IdeaVanished));
        }

        Ok(VoteOutcome::Applied { idea_id: idea.id, kind, sign })
    }

    /// The correlation heuristic: an idea "belongs to" a message when its
    /// stored timestamp equals the message's timestamp exactly. First match
    /// wins; callers verify author and content afterwards.
    async fn find_idea_for_message(
        &self,
        channel_id: &str,
        ts: i64,
    ) -> Result<Option<Idea>, VoteError> {
        debug!(
            event_name = "vote.correlation_lookup",
            channel_id = %channel_id,
            ts,
            "looking up idea by exact timestamp"
        );
        let matches = self.store.list_by_time_range(ts, ts).await?;
        Ok(matches.into_iter().next())
    }
}
