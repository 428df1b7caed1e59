use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{FixedOffset, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::watch;

use super::container::StateContainer;
use super::engine::{InsertPatch, MutationEngine};
use crate::error::SyncError;
use crate::models::{
    generate_temp_id, remove_by_id, replace_by_id, ChatAuthor, ChatMessage, ChatMessageRecord,
    ThreadRef,
};
use crate::remote::RemoteClient;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatState {
    pub threads: HashMap<ThreadRef, Vec<ChatMessage>>,
}

impl ChatState {
    pub fn messages(&self, thread: &ThreadRef) -> &[ChatMessage] {
        self.threads.get(thread).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Server records first, in server order, then the local messages the page
/// could not contain yet, in their existing order: pending sends, and
/// whatever `confirmed_late` accepts. Any other local message missing from
/// the page was removed on the server and is dropped.
pub fn merge_messages(
    existing: &[ChatMessage],
    incoming: Vec<ChatMessage>,
    confirmed_late: impl Fn(&ChatMessage) -> bool,
) -> Vec<ChatMessage> {
    let server_ids: HashSet<&str> = incoming.iter().map(|m| m.id.as_str()).collect();
    let retained: Vec<ChatMessage> = existing
        .iter()
        .filter(|m| !server_ids.contains(m.id.as_str()))
        .filter(|m| m.pending || confirmed_late(m))
        .cloned()
        .collect();

    let mut merged = incoming;
    merged.extend(retained);
    merged
}

/// Orders send confirmations against fetches. A fetch issued before a send
/// was confirmed may legitimately omit that message.
#[derive(Default)]
struct SendLedger {
    revision: AtomicU64,
    confirmed: Mutex<HashMap<String, u64>>,
}

impl SendLedger {
    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    fn record(&self, message_id: &str) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        self.confirmed.lock().insert(message_id.to_string(), revision);
    }

    fn confirmed_after(&self, message_id: &str, revision: u64) -> bool {
        self.confirmed
            .lock()
            .get(message_id)
            .is_some_and(|confirmed| *confirmed > revision)
    }

    /// The server has caught up with these ids
    fn forget(&self, message_ids: &HashSet<String>) {
        self.confirmed.lock().retain(|id, _| !message_ids.contains(id));
    }

    fn clear(&self) {
        self.confirmed.lock().clear();
    }
}

struct OutgoingMessage {
    thread: ThreadRef,
    message: ChatMessage,
    viewer_id: String,
    offset: FixedOffset,
    ledger: Arc<SendLedger>,
}

impl InsertPatch<ChatState, ChatMessageRecord> for OutgoingMessage {
    fn temp_id(&self) -> &str {
        &self.message.id
    }

    fn insert(&self, state: &mut ChatState) {
        state
            .threads
            .entry(self.thread.clone())
            .or_default()
            .push(self.message.clone());
    }

    fn reconcile(&self, state: &mut ChatState, confirmed: &ChatMessageRecord) {
        self.ledger.record(&confirmed.id);
        let Some(messages) = state.threads.get_mut(&self.thread) else {
            return;
        };
        // A fetch may already have delivered the permanent record
        if messages.iter().any(|m| m.id == confirmed.id) {
            remove_by_id(messages, &self.message.id);
            return;
        }
        let confirmed = ChatMessage::from_record(confirmed.clone(), &self.viewer_id, self.offset);
        replace_by_id(messages, &self.message.id, confirmed);
    }

    fn discard(&self, state: &mut ChatState) {
        if let Some(messages) = state.threads.get_mut(&self.thread) {
            remove_by_id(messages, &self.message.id);
        }
    }
}

/// Message lists for event and community threads.
pub struct ChatReconciler<R> {
    remote: Arc<R>,
    container: StateContainer<ChatState>,
    engine: MutationEngine,
    offset: FixedOffset,
    ledger: Arc<SendLedger>,
}

impl<R: RemoteClient> ChatReconciler<R> {
    /// `offset` is the zone display times are formatted in
    pub fn new(remote: Arc<R>, offset: FixedOffset) -> Self {
        Self {
            remote,
            container: StateContainer::new(ChatState::default()),
            engine: MutationEngine::new("chat"),
            offset,
            ledger: Arc::new(SendLedger::default()),
        }
    }

    pub fn container(&self) -> &StateContainer<ChatState> {
        &self.container
    }

    pub fn get_state(&self) -> ChatState {
        self.container.get_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatState> {
        self.container.subscribe()
    }

    pub fn messages(&self, thread: &ThreadRef) -> Vec<ChatMessage> {
        self.container.read(|s| s.messages(thread).to_vec())
    }

    pub async fn send_message(
        &self,
        thread: &ThreadRef,
        body: &str,
        author: &ChatAuthor,
    ) -> Result<ChatMessage, SyncError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(SyncError::validation("Message cannot be empty"));
        }

        let patch = OutgoingMessage {
            thread: thread.clone(),
            message: ChatMessage::optimistic(generate_temp_id(), body, author, Utc::now(), self.offset),
            viewer_id: author.id.clone(),
            offset: self.offset,
            ledger: self.ledger.clone(),
        };
        let remote = async {
            match thread {
                ThreadRef::Event(id) => self.remote.send_event_message(id, body).await,
                ThreadRef::Community(id) => self.remote.send_community_chat_message(id, body).await,
            }
        };

        let record = self.engine.run_insert(&self.container, patch, remote).await?;
        Ok(ChatMessage::from_record(record, &author.id, self.offset))
    }

    /// Merge the server's ordered list into the thread. On failure the
    /// thread is left untouched.
    pub async fn fetch_messages(
        &self,
        thread: &ThreadRef,
        viewer_id: &str,
    ) -> Result<Vec<ChatMessage>, SyncError> {
        let issued_at = self.ledger.revision();
        let records = match thread {
            ThreadRef::Event(id) => self.remote.get_event_chat(id).await?,
            ThreadRef::Community(id) => self.remote.get_community_chat(id).await?,
        };
        let incoming: Vec<ChatMessage> = records
            .into_iter()
            .map(|record| ChatMessage::from_record(record, viewer_id, self.offset))
            .collect();
        let server_ids: HashSet<String> = incoming.iter().map(|m| m.id.clone()).collect();

        let merged = self.container.dispatch(|state| {
            let merged = merge_messages(state.messages(thread), incoming, |m| {
                self.ledger.confirmed_after(&m.id, issued_at)
            });
            state.threads.insert(thread.clone(), merged.clone());
            merged
        });
        self.ledger.forget(&server_ids);
        tracing::debug!("chat {}: {} messages after merge", thread, merged.len());
        Ok(merged)
    }

    /// Fetch several threads at once. One result per thread, in input order.
    pub async fn fetch_threads(
        &self,
        threads: &[ThreadRef],
        viewer_id: &str,
    ) -> Vec<Result<Vec<ChatMessage>, SyncError>> {
        join_all(
            threads
                .iter()
                .map(|thread| self.fetch_messages(thread, viewer_id)),
        )
        .await
    }

    pub fn clear_thread(&self, thread: &ThreadRef) {
        self.container.dispatch(|state| {
            state.threads.remove(thread);
        });
    }

    pub fn clear(&self) {
        self.container.replace(ChatState::default());
        self.ledger.clear();
    }
}
