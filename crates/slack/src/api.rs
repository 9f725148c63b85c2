use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::blocks::MessageTemplate;

pub const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// A message fetched back from the platform by channel + timestamp, the
/// only handle a reaction event gives us.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedMessage {
    pub user_id: String,
    pub text: String,
    pub ts: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("slack api transport error: {0}")]
    Transport(String),
    #[error("slack api `{method}` failed: {error}")]
    Call { method: String, error: String },
}

/// Outbound Slack Web API surface consumed by the flows. Implementations
/// own their own timeout/retry policy; callers treat every method as a
/// single fallible call.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Posts a message visible only to `user_id` in the channel.
    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError>;

    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError>;

    /// Resolves a user id to a display name. Callers fall back to the raw
    /// id when this fails.
    async fn resolve_user_name(&self, user_id: &str) -> Result<String, ApiError>;

    /// Fetches the single message at exactly `ts` in the channel, if any.
    async fn fetch_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<FetchedMessage>, ApiError>;
}

pub struct HttpChatApi {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl HttpChatApi {
    pub fn new(bot_token: SecretString) -> Self {
        Self::with_base_url(bot_token, SLACK_API_BASE_URL)
    }

    pub fn with_base_url(bot_token: SecretString, base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), bot_token }
    }

    async fn post_json(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        let payload: serde_json::Value =
            response.json().await.map_err(|error| ApiError::Transport(error.to_string()))?;

        if payload.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            let error = payload
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(ApiError::Call { method: method.to_string(), error });
        }

        Ok(payload)
    }

    async fn get_json(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<serde_json::Value, ApiError> {
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        let payload: serde_json::Value =
            response.json().await.map_err(|error| ApiError::Transport(error.to_string()))?;

        if payload.get("ok").and_then(serde_json::Value::as_bool) != Some(true) {
            let error = payload
                .get("error")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            return Err(ApiError::Call { method: method.to_string(), error });
        }

        Ok(payload)
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    profile: UserProfile,
}

#[derive(Debug, Default, Deserialize)]
struct UserProfile {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    real_name: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    messages: Vec<HistoryMessage>,
}

#[derive(Debug, Deserialize)]
struct HistoryMessage {
    #[serde(default)]
    user: String,
    #[serde(default)]
    text: String,
    ts: String,
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn send_ephemeral(
        &self,
        channel_id: &str,
        user_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut body = json!({
            "channel": channel_id,
            "user": user_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        self.post_json("chat.postEphemeral", body).await.map(|_| ())
    }

    async fn send_channel_message(
        &self,
        channel_id: &str,
        message: &MessageTemplate,
        thread_ts: Option<&str>,
    ) -> Result<(), ApiError> {
        let mut body = json!({
            "channel": channel_id,
            "text": message.fallback_text,
            "blocks": message.blocks,
        });
        if let Some(thread_ts) = thread_ts {
            body["thread_ts"] = json!(thread_ts);
        }

        self.post_json("chat.postMessage", body).await.map(|_| ())
    }

    async fn resolve_user_name(&self, user_id: &str) -> Result<String, ApiError> {
        let payload = self.get_json("users.info", &[("user", user_id)]).await?;
        let parsed: UserInfoResponse = serde_json::from_value(payload)
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        let profile = parsed.user.profile;
        if !profile.display_name.is_empty() {
            Ok(profile.display_name)
        } else if !profile.real_name.is_empty() {
            Ok(profile.real_name)
        } else {
            Ok(user_id.to_string())
        }
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        ts: &str,
    ) -> Result<Option<FetchedMessage>, ApiError> {
        let payload = self
            .get_json(
                "conversations.history",
                &[("channel", channel_id), ("oldest", ts), ("inclusive", "true"), ("limit", "1")],
            )
            .await?;
        let parsed: HistoryResponse = serde_json::from_value(payload)
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        Ok(parsed.messages.into_iter().next().map(|message| FetchedMessage {
            user_id: message.user,
            text: message.text,
            ts: message.ts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{ApiError, ChatApi, HttpChatApi};
    use crate::blocks;

    fn api(server: &MockServer) -> HttpChatApi {
        HttpChatApi::with_base_url("xoxb-test".to_string().into(), server.uri())
    }

    #[tokio::test]
    async fn post_ephemeral_sends_blocks_and_fallback_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postEphemeral"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C1",
                "user": "U1",
                "text": "Thank you <@U1>! Your idea has been submitted.",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let message = blocks::submission_received_message("U1");
        api(&server).send_ephemeral("C1", "U1", &message, None).await.expect("post");
    }

    #[tokio::test]
    async fn channel_message_threads_when_thread_ts_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C1",
                "thread_ts": "1700000000.000100",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let message = blocks::text_message("hello");
        api(&server)
            .send_channel_message("C1", &message, Some("1700000000.000100"))
            .await
            .expect("post");
    }

    #[tokio::test]
    async fn api_level_failure_maps_to_call_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"ok": false, "error": "channel_not_found"}),
            ))
            .mount(&server)
            .await;

        let message = blocks::text_message("hello");
        let error = api(&server)
            .send_channel_message("C-missing", &message, None)
            .await
            .expect_err("must fail");

        assert!(matches!(
            error,
            ApiError::Call { ref method, ref error }
                if method == "chat.postMessage" && error == "channel_not_found"
        ));
    }

    #[tokio::test]
    async fn user_name_resolution_prefers_display_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .and(query_param("user", "U1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user": { "profile": { "display_name": "dana", "real_name": "Dana Scully" } }
            })))
            .mount(&server)
            .await;

        let name = api(&server).resolve_user_name("U1").await.expect("resolve");
        assert_eq!(name, "dana");
    }

    #[tokio::test]
    async fn user_name_resolution_falls_back_to_real_name_then_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .and(query_param("user", "U2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user": { "profile": { "display_name": "", "real_name": "Fox Mulder" } }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users.info"))
            .and(query_param("user", "U3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user": { "profile": {} }
            })))
            .mount(&server)
            .await;

        assert_eq!(api(&server).resolve_user_name("U2").await.expect("resolve"), "Fox Mulder");
        assert_eq!(api(&server).resolve_user_name("U3").await.expect("resolve"), "U3");
    }

    #[tokio::test]
    async fn fetch_message_reads_the_single_history_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .and(query_param("channel", "C1"))
            .and(query_param("oldest", "1000.000100"))
            .and(query_param("inclusive", "true"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "messages": [
                    { "user": "U1", "text": "PI: Dark mode | Add a dark theme", "ts": "1000.000100" }
                ]
            })))
            .mount(&server)
            .await;

        let message = api(&server)
            .fetch_message("C1", "1000.000100")
            .await
            .expect("fetch")
            .expect("message present");

        assert_eq!(message.user_id, "U1");
        assert_eq!(message.text, "PI: Dark mode | Add a dark theme");
        assert_eq!(message.ts, "1000.000100");
    }

    #[tokio::test]
    async fn fetch_message_returns_none_for_empty_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/conversations.history"))
            .respond_with(ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"ok": true, "messages": []})))
            .mount(&server)
            .await;

        let message = api(&server).fetch_message("C1", "1.0").await.expect("fetch");
        assert!(message.is_none());
    }
}
