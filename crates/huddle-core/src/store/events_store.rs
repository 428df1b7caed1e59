use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::watch;

use super::container::StateContainer;
use super::engine::{
    ActionKind, Callbacks, InsertPatch, MutationEngine, MutationKey, MutationOutcome,
    MutationPhase, OptimisticPatch,
};
use crate::error::SyncError;
use crate::models::{
    find_by_id, generate_temp_id, remove_by_id, replace_by_id, Event, NewEvent,
};
use crate::remote::RemoteClient;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsState {
    /// Newest first; created events are inserted at the head
    pub events: Vec<Event>,
    pub joined_ids: BTreeSet<String>,
    pub saved_ids: BTreeSet<String>,
}

impl EventsState {
    pub fn event(&self, event_id: &str) -> Option<&Event> {
        find_by_id(&self.events, event_id)
    }
}

/// Everything an event toggle can touch
#[derive(Debug, Clone)]
struct EventSnapshot {
    event_id: String,
    record: Option<Event>,
    joined: bool,
    saved: bool,
}

fn snapshot_event(state: &EventsState, event_id: &str) -> EventSnapshot {
    EventSnapshot {
        event_id: event_id.to_string(),
        record: state.event(event_id).cloned(),
        joined: state.joined_ids.contains(event_id),
        saved: state.saved_ids.contains(event_id),
    }
}

fn restore_event(state: &mut EventsState, snapshot: EventSnapshot) {
    if let Some(record) = snapshot.record {
        replace_by_id(&mut state.events, &snapshot.event_id, record);
    }
    set_membership(&mut state.joined_ids, &snapshot.event_id, snapshot.joined);
    set_membership(&mut state.saved_ids, &snapshot.event_id, snapshot.saved);
}

fn set_membership(set: &mut BTreeSet<String>, id: &str, member: bool) {
    if member {
        set.insert(id.to_string());
    } else {
        set.remove(id);
    }
}

struct AttendancePatch {
    event_id: String,
    join: bool,
}

impl OptimisticPatch<EventsState> for AttendancePatch {
    type Snapshot = EventSnapshot;

    fn key(&self) -> MutationKey {
        let action = if self.join { ActionKind::Join } else { ActionKind::Leave };
        MutationKey::new(self.event_id.clone(), action)
    }

    fn is_noop(&self, state: &EventsState) -> bool {
        state.joined_ids.contains(&self.event_id) == self.join
    }

    fn snapshot(&self, state: &EventsState) -> EventSnapshot {
        snapshot_event(state, &self.event_id)
    }

    fn apply(&self, state: &mut EventsState) {
        if let Some(event) = state.events.iter_mut().find(|e| e.id == self.event_id) {
            event.attendee_count = if self.join {
                event.attendee_count.saturating_add(1)
            } else {
                event.attendee_count.saturating_sub(1)
            };
            event.joined = self.join;
        }
        set_membership(&mut state.joined_ids, &self.event_id, self.join);
    }

    fn restore(&self, state: &mut EventsState, snapshot: EventSnapshot) {
        restore_event(state, snapshot);
    }
}

struct SavePatch {
    event_id: String,
    save: bool,
}

impl OptimisticPatch<EventsState> for SavePatch {
    type Snapshot = EventSnapshot;

    fn key(&self) -> MutationKey {
        let action = if self.save { ActionKind::Save } else { ActionKind::Unsave };
        MutationKey::new(self.event_id.clone(), action)
    }

    fn is_noop(&self, state: &EventsState) -> bool {
        state.saved_ids.contains(&self.event_id) == self.save
    }

    fn snapshot(&self, state: &EventsState) -> EventSnapshot {
        snapshot_event(state, &self.event_id)
    }

    fn apply(&self, state: &mut EventsState) {
        if let Some(event) = state.events.iter_mut().find(|e| e.id == self.event_id) {
            event.saved = self.save;
        }
        set_membership(&mut state.saved_ids, &self.event_id, self.save);
    }

    fn restore(&self, state: &mut EventsState, snapshot: EventSnapshot) {
        restore_event(state, snapshot);
    }
}

struct EventPlaceholder {
    temp_id: String,
    draft: NewEvent,
}

impl InsertPatch<EventsState, Event> for EventPlaceholder {
    fn temp_id(&self) -> &str {
        &self.temp_id
    }

    fn insert(&self, state: &mut EventsState) {
        state
            .events
            .insert(0, Event::placeholder(self.temp_id.clone(), &self.draft));
    }

    fn reconcile(&self, state: &mut EventsState, confirmed: &Event) {
        let mut confirmed = confirmed.clone();
        confirmed.pending = false;
        let (joined, saved) = (confirmed.joined, confirmed.saved);
        let id = confirmed.id.clone();
        if replace_by_id(&mut state.events, &self.temp_id, confirmed) {
            set_membership(&mut state.joined_ids, &id, joined);
            set_membership(&mut state.saved_ids, &id, saved);
        }
    }

    fn discard(&self, state: &mut EventsState) {
        remove_by_id(&mut state.events, &self.temp_id);
    }
}

/// Events listing plus the viewer's joined and saved sets.
pub struct EventStore<R> {
    remote: Arc<R>,
    container: StateContainer<EventsState>,
    engine: MutationEngine,
}

impl<R: RemoteClient> EventStore<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self {
            remote,
            container: StateContainer::new(EventsState::default()),
            engine: MutationEngine::new("events"),
        }
    }

    pub fn container(&self) -> &StateContainer<EventsState> {
        &self.container
    }

    pub fn get_state(&self) -> EventsState {
        self.container.get_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<EventsState> {
        self.container.subscribe()
    }

    /// Load the listing from an initial fetch. Joined and saved sets are
    /// rebuilt from the records' flags.
    pub fn set_events(&self, events: Vec<Event>) {
        let joined_ids = events
            .iter()
            .filter(|e| e.joined)
            .map(|e| e.id.clone())
            .collect();
        let saved_ids = events
            .iter()
            .filter(|e| e.saved)
            .map(|e| e.id.clone())
            .collect();
        self.container.replace(EventsState {
            events,
            joined_ids,
            saved_ids,
        });
    }

    pub fn event(&self, event_id: &str) -> Option<Event> {
        self.container.read(|s| s.event(event_id).cloned())
    }

    pub fn is_joined(&self, event_id: &str) -> bool {
        self.container.read(|s| s.joined_ids.contains(event_id))
    }

    pub fn is_saved(&self, event_id: &str) -> bool {
        self.container.read(|s| s.saved_ids.contains(event_id))
    }

    pub fn phase(&self, event_id: &str, action: ActionKind) -> MutationPhase {
        self.engine.phase(&MutationKey::new(event_id, action))
    }

    /// Joining an event already joined (or leaving one not joined) is a
    /// no-op with no remote call.
    pub async fn join_event(&self, event_id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.join_event_with(event_id, Callbacks::default()).await
    }

    pub async fn join_event_with(
        &self,
        event_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = AttendancePatch {
            event_id: event_id.to_string(),
            join: true,
        };
        self.engine
            .run_with(&self.container, patch, self.remote.join_event(event_id), callbacks)
            .await
    }

    pub async fn leave_event(&self, event_id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.leave_event_with(event_id, Callbacks::default()).await
    }

    pub async fn leave_event_with(
        &self,
        event_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = AttendancePatch {
            event_id: event_id.to_string(),
            join: false,
        };
        self.engine
            .run_with(&self.container, patch, self.remote.leave_event(event_id), callbacks)
            .await
    }

    pub async fn save_event(&self, event_id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.save_event_with(event_id, Callbacks::default()).await
    }

    pub async fn save_event_with(
        &self,
        event_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = SavePatch {
            event_id: event_id.to_string(),
            save: true,
        };
        self.engine
            .run_with(&self.container, patch, self.remote.save_event(event_id), callbacks)
            .await
    }

    pub async fn unsave_event(&self, event_id: &str) -> Result<MutationOutcome<()>, SyncError> {
        self.unsave_event_with(event_id, Callbacks::default()).await
    }

    pub async fn unsave_event_with(
        &self,
        event_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = SavePatch {
            event_id: event_id.to_string(),
            save: false,
        };
        self.engine
            .run_with(&self.container, patch, self.remote.unsave_event(event_id), callbacks)
            .await
    }

    /// Validates first; an invalid draft never touches state.
    pub async fn create_event(&self, draft: NewEvent) -> Result<Event, SyncError> {
        draft.validate()?;
        let remote = self.remote.create_event(&draft);
        let patch = EventPlaceholder {
            temp_id: generate_temp_id(),
            draft: draft.clone(),
        };
        self.engine.run_insert(&self.container, patch, remote).await
    }

    /// Drop an event after the UI confirmed its deletion
    pub fn remove_event(&self, event_id: &str) -> bool {
        self.container.dispatch(|state| {
            state.joined_ids.remove(event_id);
            state.saved_ids.remove(event_id);
            remove_by_id(&mut state.events, event_id)
        })
    }

    pub fn clear(&self) {
        self.container.replace(EventsState::default());
    }
}
