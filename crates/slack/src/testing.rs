//! Shared fakes for flow tests: a scriptable, recording `ChatApi`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::api::{ApiError, ChatApi, FetchedMessage};
use crate::blocks::MessageTemplate;

#[derive(Clone, Debug)]
pub(crate) struct SentMessage {
    pub channel_id: String,
    pub user_id: Option<String>,
    pub fallback_text: String,
    pub thread_ts: Option<String>,
}

#[derive(Default)]
pub(crate) struct FakeChatApiState {
    pub user_names: HashMap<String, String>,
    pub messages: HashMap<(String, String), FetchedMessage>,
    pub ephemeral_sent: Vec<SentMessage>,
    pub channel_sent: Vec<SentMessage>,
    pub fetch_calls: usize,
    pub fail_user_lookup: bool,
    pub fail_sends: bool,
    pub fail_fetch: bool,
}

#[derive(Default)]
pub(crate) struct FakeChatApi {
    pub state: Mutex<FakeChatApiState>,
}

impl FakeChatApi {
    pub async fn add_user(&self, user_id: &str, name: &str) {
        self.state.lock().await.user_names.insert(user_id.to_string(), name.to_string());
    }

    pub async fn add_message(&self, channel_id: &str, ts: &str, user_id: &str, text: &str) {
        self.state.lock().await.messages.insert(
            (channel_id.to_string(), ts.to_string()),
            FetchedMessage {
                user_id: user_id.to_string(),
                text: text.to_string(),
                ts: ts.to_string(),
            },
        );
    }

    pub async fn ephemeral_sent(&self) -> Vec<SentMessage> {
        self.state.lock().await.ephemeral_sent.clone()
    }

    pub async fn channel_sent(&self) -> Vec<SentMessage> {
        self.state.lock().await.channel_sent.clone()
    }

    pub async fn fetch_calls(&self) -> usize {
        self.state.lock().await.fetch_calls
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        if state.fail_sends {
            return Err(ApiError::Transport("scripted send failure".to_string()));
        }
        state.ephemeral_sent.push(SentMessage {
            channel_id: channel_id.to_string(),
            user_id: Some(user_id.to_string()),
            fallback_text: message.fallback_text.clone(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(())
    }

    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().await;
        if state.fail_sends {
            return Err(ApiError::Transport("scripted send failure".to_string()));
        }
        state.channel_sent.push(SentMessage {
            channel_id: channel_id.to_string(),
            user_id: None,
            fallback_text: message.fallback_text.clone(),
            thread_ts: thread_ts.map(str::to_string),
        });
        Ok(())
    }

    async fn resolve_user_name(&self, user_id: &str) -> Result<String, ApiError> {
        let state = self.state.lock().await;
        if state.fail_user_lookup {
            return Err(ApiError::Transport("scripted lookup failure".to_string()));
        }
        Ok(state.user_names.get(user_id).cloned().unwrap_or_else(|| user_id.to_string()))
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<FetchedMessage>, ApiError> {
        let mut state = self.state.lock().await;
        state.fetch_calls += 1;
        if state.fail_fetch {
            return Err(ApiError::Transport("scripted fetch failure".to_string()));
        }
        Ok(state.messages.get(&(channel_id.to_string(), ts.to_string())).cloned())
    }
}
