//! Scripted in-memory RemoteClient for store tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::SyncError;
use crate::models::{ChatMessageRecord, Event, FeedPost, NewEvent, NewPost};
use crate::remote::{RemoteClient, RemoteResult, SessionInfo};

pub const VIEWER_ID: &str = "u1";
pub const VIEWER_NAME: &str = "Me";
pub const SENT_AT: &str = "2026-01-01T09:30:00Z";

#[derive(Default)]
pub struct MockRemote {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, SyncError>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    chat_pages: Mutex<HashMap<String, Vec<ChatMessageRecord>>>,
    next_id: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call to `op` fails with `err`
    pub fn fail(&self, op: &str, err: SyncError) {
        self.failures.lock().insert(op.to_string(), err);
    }

    pub fn succeed(&self, op: &str) {
        self.failures.lock().remove(op);
    }

    /// The next call to `op` waits until the returned sender fires (or drops)
    pub fn hold(&self, op: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(op.to_string(), rx);
        tx
    }

    pub fn set_chat_page(&self, thread_id: &str, records: Vec<ChatMessageRecord>) {
        self.chat_pages.lock().insert(thread_id.to_string(), records);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, op: &str) -> usize {
        let prefix = format!("{}:", op);
        self.calls
            .lock()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn respond(&self, op: &str, arg: &str) -> RemoteResult<()> {
        self.calls.lock().push(format!("{}:{}", op, arg));
        let gate = self.gates.lock().remove(op);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let failure = self.failures.lock().get(op).cloned();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn sent_record(&self, body: &str) -> ChatMessageRecord {
        ChatMessageRecord {
            id: self.next_id("msg"),
            user_name: VIEWER_NAME.to_string(),
            user_id: VIEWER_ID.to_string(),
            message: body.to_string(),
            created_at: SENT_AT.to_string(),
        }
    }
}

pub fn record(id: &str, user_id: &str, name: &str, message: &str) -> ChatMessageRecord {
    ChatMessageRecord {
        id: id.to_string(),
        user_name: name.to_string(),
        user_id: user_id.to_string(),
        message: message.to_string(),
        created_at: "2026-01-01T12:00:00Z".to_string(),
    }
}

impl RemoteClient for MockRemote {
    async fn join_event(&self, event_id: &str) -> RemoteResult<()> {
        self.respond("join_event", event_id).await
    }

    async fn leave_event(&self, event_id: &str) -> RemoteResult<()> {
        self.respond("leave_event", event_id).await
    }

    async fn save_event(&self, event_id: &str) -> RemoteResult<()> {
        self.respond("save_event", event_id).await
    }

    async fn unsave_event(&self, event_id: &str) -> RemoteResult<()> {
        self.respond("unsave_event", event_id).await
    }

    async fn create_event(&self, draft: &NewEvent) -> RemoteResult<Event> {
        self.respond("create_event", &draft.title).await?;
        Ok(Event {
            id: self.next_id("ev"),
            title: draft.title.clone(),
            attendee_count: 1,
            spot_capacity: draft.spot_capacity,
            joined: true,
            saved: false,
            starts_at: Some(draft.starts_at.clone()),
            location: draft.location.clone(),
            description: draft.description.clone(),
            pending: false,
        })
    }

    async fn join_community(&self, community_id: &str) -> RemoteResult<()> {
        self.respond("join_community", community_id).await
    }

    async fn leave_community(&self, community_id: &str) -> RemoteResult<()> {
        self.respond("leave_community", community_id).await
    }

    async fn react_to_post(&self, post_id: &str, emoji: &str) -> RemoteResult<()> {
        self.respond("react_to_post", &format!("{}:{}", post_id, emoji)).await
    }

    async fn create_post(&self, draft: &NewPost) -> RemoteResult<FeedPost> {
        self.respond("create_post", &draft.body).await?;
        Ok(FeedPost {
            id: self.next_id("post"),
            author_name: VIEWER_NAME.to_string(),
            body: draft.body.clone(),
            community_id: draft.community_id.clone(),
            created_at: Some(SENT_AT.to_string()),
            reactions: Default::default(),
            my_reactions: Default::default(),
            pending: false,
        })
    }

    async fn send_event_message(&self, event_id: &str, body: &str) -> RemoteResult<ChatMessageRecord> {
        self.respond("send_event_message", event_id).await?;
        Ok(self.sent_record(body))
    }

    async fn send_community_chat_message(
        &self,
        community_id: &str,
        body: &str,
    ) -> RemoteResult<ChatMessageRecord> {
        self.respond("send_community_chat_message", community_id).await?;
        Ok(self.sent_record(body))
    }

    async fn get_event_chat(&self, event_id: &str) -> RemoteResult<Vec<ChatMessageRecord>> {
        self.respond("get_event_chat", event_id).await?;
        Ok(self.chat_pages.lock().get(event_id).cloned().unwrap_or_default())
    }

    async fn get_community_chat(&self, community_id: &str) -> RemoteResult<Vec<ChatMessageRecord>> {
        self.respond("get_community_chat", community_id).await?;
        Ok(self.chat_pages.lock().get(community_id).cloned().unwrap_or_default())
    }

    async fn check_session(&self) -> RemoteResult<SessionInfo> {
        self.respond("check_session", "").await?;
        Ok(SessionInfo {
            user_id: VIEWER_ID.to_string(),
            display_name: VIEWER_NAME.to_string(),
        })
    }
}
