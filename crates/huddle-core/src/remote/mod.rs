//! Network boundary consumed by the stores.
//!
//! Every operation is a single call: it resolves with parsed data or fails
//! with a [`SyncError`]. Nothing here retries or caches.

pub mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::models::{ChatMessageRecord, Event, FeedPost, NewEvent, NewPost};

pub use http::HttpRemoteClient;

pub type RemoteResult<T> = Result<T, SyncError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
}

pub trait RemoteClient: Send + Sync {
    fn join_event(&self, event_id: &str) -> impl Future<Output = RemoteResult<()>> + Send;
    fn leave_event(&self, event_id: &str) -> impl Future<Output = RemoteResult<()>> + Send;
    fn save_event(&self, event_id: &str) -> impl Future<Output = RemoteResult<()>> + Send;
    fn unsave_event(&self, event_id: &str) -> impl Future<Output = RemoteResult<()>> + Send;
    fn create_event(&self, draft: &NewEvent) -> impl Future<Output = RemoteResult<Event>> + Send;

    fn join_community(&self, community_id: &str)
        -> impl Future<Output = RemoteResult<()>> + Send;
    fn leave_community(&self, community_id: &str)
        -> impl Future<Output = RemoteResult<()>> + Send;

    fn react_to_post(
        &self,
        post_id: &str,
        emoji: &str,
    ) -> impl Future<Output = RemoteResult<()>> + Send;
    fn create_post(&self, draft: &NewPost) -> impl Future<Output = RemoteResult<FeedPost>> + Send;

    fn send_event_message(
        &self,
        event_id: &str,
        body: &str,
    ) -> impl Future<Output = RemoteResult<ChatMessageRecord>> + Send;
    fn send_community_chat_message(
        &self,
        community_id: &str,
        body: &str,
    ) -> impl Future<Output = RemoteResult<ChatMessageRecord>> + Send;
    fn get_event_chat(
        &self,
        event_id: &str,
    ) -> impl Future<Output = RemoteResult<Vec<ChatMessageRecord>>> + Send;
    fn get_community_chat(
        &self,
        community_id: &str,
    ) -> impl Future<Output = RemoteResult<Vec<ChatMessageRecord>>> + Send;

    fn check_session(&self) -> impl Future<Output = RemoteResult<SessionInfo>> + Send;
}
