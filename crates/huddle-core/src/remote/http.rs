use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{RemoteClient, RemoteResult, SessionInfo};
use crate::config::CoreConfig;
use crate::error::SyncError;
use crate::models::{ChatMessageRecord, Event, FeedPost, NewEvent, NewPost};

/// JSON REST implementation of [`RemoteClient`].
pub struct HttpRemoteClient {
    base_url: Url,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteClient {
    pub fn new(config: &CoreConfig) -> RemoteResult<Self> {
        let base_url = Url::parse(&config.api_base_url).map_err(|e| {
            SyncError::Transport(format!("invalid api base url {}: {}", config.api_base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::Transport(format!(
                "invalid api base url {}",
                config.api_base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            auth_token: config.auth_token.clone(),
            client,
        })
    }

    pub fn set_auth_token(&mut self, token: Option<String>) {
        self.auth_token = token;
    }

    /// Base url plus percent-encoded path segments
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let request = self.client.request(method, self.endpoint(segments));
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> RemoteResult<reqwest::Response> {
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!("remote rejected ({}): {}", status, body);
            return Err(SyncError::RemoteRejection {
                status: Some(status.as_u16()),
                message: rejection_message(&body, fallback),
            });
        }

        Ok(response)
    }

    async fn send_unit(&self, request: RequestBuilder, fallback: &str) -> RemoteResult<()> {
        self.execute(request, fallback).await?;
        Ok(())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> RemoteResult<T> {
        let response = self.execute(request, fallback).await?;
        let text = response.text().await.map_err(transport_error)?;
        serde_json::from_str(&text).map_err(|e| SyncError::Decode(e.to_string()))
    }
}

fn transport_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Transport("request timed out".to_string())
    } else {
        SyncError::Transport(e.to_string())
    }
}

/// Pull a human-readable message out of an error body, falling back to the
/// operation-specific string.
fn rejection_message(body: &str, fallback: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return fallback.to_string();
    };

    let message = value["error"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .or_else(|| value["error"]["message"].as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty());

    message.unwrap_or(fallback).to_string()
}

impl RemoteClient for HttpRemoteClient {
    async fn join_event(&self, event_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["events", event_id, "join"]);
        self.send_unit(request, "Failed to join event").await
    }

    async fn leave_event(&self, event_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["events", event_id, "leave"]);
        self.send_unit(request, "Failed to leave event").await
    }

    async fn save_event(&self, event_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["events", event_id, "save"]);
        self.send_unit(request, "Failed to save event").await
    }

    async fn unsave_event(&self, event_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["events", event_id, "unsave"]);
        self.send_unit(request, "Failed to unsave event").await
    }

    async fn create_event(&self, draft: &NewEvent) -> RemoteResult<Event> {
        let request = self.request(Method::POST, &["events"]).json(draft);
        self.send_json(request, "Failed to create event").await
    }

    async fn join_community(&self, community_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["communities", community_id, "join"]);
        self.send_unit(request, "Failed to join community").await
    }

    async fn leave_community(&self, community_id: &str) -> RemoteResult<()> {
        let request = self.request(Method::POST, &["communities", community_id, "leave"]);
        self.send_unit(request, "Failed to leave community").await
    }

    async fn react_to_post(&self, post_id: &str, emoji: &str) -> RemoteResult<()> {
        let request = self
            .request(Method::POST, &["posts", post_id, "reactions"])
            .json(&json!({ "emoji": emoji }));
        self.send_unit(request, "Failed to react to post").await
    }

    async fn create_post(&self, draft: &NewPost) -> RemoteResult<FeedPost> {
        let request = self.request(Method::POST, &["posts"]).json(draft);
        self.send_json(request, "Failed to create post").await
    }

    async fn send_event_message(&self, event_id: &str, body: &str) -> RemoteResult<ChatMessageRecord> {
        let request = self
            .request(Method::POST, &["events", event_id, "chat"])
            .json(&json!({ "message": body }));
        self.send_json(request, "Failed to send message").await
    }

    async fn send_community_chat_message(
        &self,
        community_id: &str,
        body: &str,
    ) -> RemoteResult<ChatMessageRecord> {
        let request = self
            .request(Method::POST, &["communities", community_id, "chat"])
            .json(&json!({ "message": body }));
        self.send_json(request, "Failed to send message").await
    }

    async fn get_event_chat(&self, event_id: &str) -> RemoteResult<Vec<ChatMessageRecord>> {
        let request = self.request(Method::GET, &["events", event_id, "chat"]);
        self.send_json(request, "Failed to load messages").await
    }

    async fn get_community_chat(&self, community_id: &str) -> RemoteResult<Vec<ChatMessageRecord>> {
        let request = self.request(Method::GET, &["communities", community_id, "chat"]);
        self.send_json(request, "Failed to load messages").await
    }

    async fn check_session(&self) -> RemoteResult<SessionInfo> {
        let request = self.request(Method::GET, &["auth", "session"]);
        self.send_json(request, "Session expired").await
    }
}
