use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};

use forkidea_core::domain::idea::{IdeaId, NewIdea};
use forkidea_core::parser;
use forkidea_db::repositories::{IdeaRepository, RepositoryError};

use crate::api::ChatApi;
use crate::blocks;
use crate::events::{parse_slack_ts, MessageEvent};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// A new idea was appended to the store.
    Stored(IdeaId),
    /// The text was empty after trigger stripping; the submitter was
    /// prompted and nothing was written.
    Prompted,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

/// Turns a trigger-prefixed message into a stored idea plus notifications.
///
/// The idea is created with the triggering message's own timestamp - the
/// vote aggregator later finds the record by that exact value, so wall-clock
/// is only a fallback for events that arrive without one. Notification
/// failures after a successful create are logged and swallowed: an
/// announced-nowhere idea is still a valid idea.
pub struct SubmissionService {
    store: Arc<dyn IdeaRepository>,
    api: Arc<dyn ChatApi>,
    announce_submissions: bool,
}

impl SubmissionService {
    pub fn new(
        store: Arc<dyn IdeaRepository>,
        api: Arc<dyn ChatApi>,
        announce_submissions: bool,
    ) -> Self {
        Self { store, api, announce_submissions }
    }

    pub async fn handle_message(
        &self,
        event: &MessageEvent,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        if parser::strip_trigger(&event.text).trim().is_empty() {
            let prompt = blocks::empty_submission_message(&event.user_id);
            if let Err(error) = self
                .api
                .send_ephemeral(
                    &event.channel_id,
                    &event.user_id,
                    &prompt,
                    event.thread_ts.as_deref(),
                )
                .await
            {
                warn!(
                    event_name = "submission.prompt_failed",
                    channel_id = %event.channel_id,
                    user_id = %event.user_id,
                    error = %error,
                    "failed to deliver empty-submission prompt"
                );
            }
            return Ok(SubmissionOutcome::Prompted);
        }

        let (title, description) = parser::parse_idea_text(&event.text);

        let user_name = match self.api.resolve_user_name(&event.user_id).await {
            Ok(name) => name,
            Err(error) => {
                warn!(
                    event_name = "submission.name_lookup_failed",
                    user_id = %event.user_id,
                    error = %error,
                    "display name lookup failed; falling back to user id"
                );
                event.user_id.clone()
            }
        };

        let submitted_at =
            parse_slack_ts(&event.ts).unwrap_or_else(|| Utc::now().timestamp());

        let id = self
            .store
            .create(NewIdea {
                user_id: event.user_id.clone(),
                user_name,
                title: title.clone(),
                description: description.clone(),
                submitted_at,
            })
            .await?;

        info!(
            event_name = "submission.stored",
            channel_id = %event.channel_id,
            user_id = %event.user_id,
            idea_id = %id.0,
            submitted_at,
            "idea stored"
        );

        if self.announce_submissions {
            let announcement = blocks::submission_announcement(
                &event.user_id,
                &title,
                &description,
                submitted_at,
            );
            if let Err(error) = self
                .api
                .send_channel_message(&event.channel_id, &announcement, event.thread_ts.as_deref())
                .await
            {
                warn!(
                    event_name = "submission.announce_failed",
                    channel_id = %event.channel_id,
                    idea_id = %id.0,
                    error = %error,
                    "failed to announce submission; idea kept"
                );
            }
        }

        let acknowledgment = blocks::submission_received_message(&event.user_id);
        if let Err(error) = self
            .api
            .send_ephemeral(
                &event.channel_id,
                &event.user_id,
                &acknowledgment,
                event.thread_ts.as_deref(),
            )
            .await
        {
            warn!(
                event_name = "submission.ack_failed",
                channel_id = %event.channel_id,
                idea_id = %id.0,
                error = %error,
                "failed to acknowledge submission; idea kept"
            );
        }

        Ok(SubmissionOutcome::Stored(id))
    }
}
