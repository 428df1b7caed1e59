use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::Identified;

/// Which conversation a message belongs to. Selects the remote route.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreadRef {
    Event(String),
    Community(String),
}

impl ThreadRef {
    pub fn id(&self) -> &str {
        match self {
            ThreadRef::Event(id) | ThreadRef::Community(id) => id,
        }
    }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadRef::Event(id) => write!(f, "event:{}", id),
            ThreadRef::Community(id) => write!(f, "community:{}", id),
        }
    }
}

/// The sender as known to the client at send time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAuthor {
    pub id: String,
    pub display_name: String,
}

/// Message as returned by the chat endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: String,
    #[serde(default)]
    pub user_name: String,
    pub user_id: String,
    pub message: String,
    pub created_at: String,
}

/// Message as held in a thread and shown by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user: String,
    pub user_id: String,
    pub message: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    pub is_me: bool,
    #[serde(default)]
    pub pending: bool,
}

impl ChatMessage {
    /// Optimistic entry appended before the send is confirmed.
    pub fn optimistic(
        temp_id: String,
        body: &str,
        author: &ChatAuthor,
        now: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            id: temp_id,
            user: author.display_name.clone(),
            user_id: author.id.clone(),
            message: body.to_string(),
            time: now.with_timezone(&offset).format(TIME_FORMAT).to_string(),
            sent_at: Some(now),
            is_me: true,
            pending: true,
        }
    }

    /// `is_me` is decided here, against the viewer at fetch time.
    pub fn from_record(record: ChatMessageRecord, viewer_id: &str, offset: FixedOffset) -> Self {
        let (time, sent_at) = format_display_time(&record.created_at, offset);
        Self {
            is_me: record.user_id == viewer_id,
            id: record.id,
            user: record.user_name,
            user_id: record.user_id,
            message: record.message,
            time,
            sent_at,
            pending: false,
        }
    }
}

impl Identified for ChatMessage {
    fn id(&self) -> &str {
        &self.id
    }
}

const TIME_FORMAT: &str = "%H:%M";

/// Format a server timestamp for display. Unparseable input is shown verbatim.
pub fn format_display_time(
    created_at: &str,
    offset: FixedOffset,
) -> (String, Option<DateTime<Utc>>) {
    match DateTime::parse_from_rfc3339(created_at) {
        Ok(parsed) => {
            let utc = parsed.with_timezone(&Utc);
            (
                utc.with_timezone(&offset).format(TIME_FORMAT).to_string(),
                Some(utc),
            )
        }
        Err(e) => {
            tracing::warn!("unparseable chat timestamp {:?}: {}", created_at, e);
            (created_at.to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn record(user_id: &str) -> ChatMessageRecord {
        ChatMessageRecord {
            id: "m1".to_string(),
            user_name: "Alice".to_string(),
            user_id: user_id.to_string(),
            message: "Hi".to_string(),
            created_at: "2026-01-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_from_record_other_user() {
        let msg = ChatMessage::from_record(record("u9"), "u1", utc());
        assert_eq!(msg.id, "m1");
        assert_eq!(msg.user, "Alice");
        assert!(!msg.is_me);
        assert_eq!(msg.message, "Hi");
        assert_eq!(msg.time, "12:00");
        assert!(!msg.pending);
    }

    #[test]
    fn test_from_record_viewer_is_me() {
        let msg = ChatMessage::from_record(record("u1"), "u1", utc());
        assert!(msg.is_me);
    }

    #[test]
    fn test_display_time_applies_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let (time, sent_at) = format_display_time("2026-01-01T12:00:00Z", offset);
        assert_eq!(time, "14:00");
        assert!(sent_at.is_some());
    }

    #[test]
    fn test_unparseable_time_shown_verbatim() {
        let (time, sent_at) = format_display_time("yesterday", utc());
        assert_eq!(time, "yesterday");
        assert!(sent_at.is_none());
    }

    #[test]
    fn test_serializes_is_me_camel_case() {
        let msg = ChatMessage::from_record(record("u9"), "u1", utc());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["isMe"], false);
        assert_eq!(json["user"], "Alice");
    }

    #[test]
    fn test_thread_ref_display() {
        assert_eq!(ThreadRef::Event("t1".into()).to_string(), "event:t1");
        assert_eq!(ThreadRef::Community("c1".into()).id(), "c1");
    }
}
