use serde::{Deserialize, Serialize};

use super::Identified;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub attendee_count: u32,
    #[serde(default)]
    pub spot_capacity: u32,
    #[serde(default)]
    pub joined: bool,
    #[serde(default)]
    pub saved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Placeholder awaiting server confirmation
    #[serde(skip)]
    pub pending: bool,
}

impl Event {
    /// Local stand-in shown while `create_event` is in flight.
    pub fn placeholder(temp_id: String, draft: &NewEvent) -> Self {
        Self {
            id: temp_id,
            title: draft.title.trim().to_string(),
            attendee_count: 0,
            spot_capacity: draft.spot_capacity,
            joined: false,
            saved: false,
            starts_at: Some(draft.starts_at.clone()),
            location: draft.location.clone(),
            description: draft.description.clone(),
            pending: true,
        }
    }

    pub fn spots_left(&self) -> u32 {
        self.spot_capacity.saturating_sub(self.attendee_count)
    }
}

impl Identified for Event {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Payload for creating an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub starts_at: String,
    pub spot_capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_id: Option<String>,
}

impl NewEvent {
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.title.trim().is_empty() {
            return Err(SyncError::validation("Event title is required"));
        }
        if self.starts_at.trim().is_empty() {
            return Err(SyncError::validation("Event start time is required"));
        }
        if self.spot_capacity == 0 {
            return Err(SyncError::validation("Event needs at least one spot"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> NewEvent {
        NewEvent {
            title: "Board games".to_string(),
            starts_at: "2026-01-01T18:00:00Z".to_string(),
            spot_capacity: 8,
            location: None,
            description: String::new(),
            community_id: None,
        }
    }

    #[test]
    fn test_parse_server_event_defaults() {
        let json = r#"{"id": "e1", "title": "Run club", "attendee_count": 5, "spot_capacity": 10}"#;
        let event: Event = serde_json::from_str(json).unwrap();
        assert_eq!(event.attendee_count, 5);
        assert!(!event.joined);
        assert!(!event.pending);
        assert_eq!(event.spots_left(), 5);
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut d = draft();
        d.title = "   ".to_string();
        assert!(matches!(d.validate(), Err(SyncError::Validation(_))));
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut d = draft();
        d.spot_capacity = 0;
        assert!(d.validate().is_err());
    }

    #[test]
    fn test_placeholder_is_pending() {
        let event = Event::placeholder("temp-1".to_string(), &draft());
        assert!(event.pending);
        assert_eq!(event.title, "Board games");
        assert_eq!(event.attendee_count, 0);
    }
}
