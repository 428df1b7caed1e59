use std::sync::Arc;

use tokio::sync::watch;

use super::container::StateContainer;
use super::engine::{
    ActionKind, Callbacks, MutationEngine, MutationKey, MutationOutcome, MutationPhase,
    OptimisticPatch,
};
use super::preferences::PreferenceStore;
use crate::error::SyncError;
use crate::models::{find_by_id, Community};
use crate::remote::RemoteClient;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommunitiesState {
    pub communities: Vec<Community>,
    /// Viewer's memberships, in join order, no duplicates
    pub joined_ids: Vec<String>,
}

impl CommunitiesState {
    pub fn is_member(&self, community_id: &str) -> bool {
        self.joined_ids.iter().any(|id| id == community_id)
    }

    pub fn community(&self, community_id: &str) -> Option<&Community> {
        find_by_id(&self.communities, community_id)
    }

    fn mirror_membership(&mut self) {
        for community in &mut self.communities {
            community.is_joined = self.joined_ids.contains(&community.id);
        }
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

fn persist_membership(prefs: &PreferenceStore, joined_ids: &[String]) {
    if let Err(e) = prefs.set_joined_communities(joined_ids) {
        tracing::warn!("failed to persist community membership: {}", e);
    }
}

/// Only this community's membership; other ids may change concurrently.
#[derive(Debug, Clone)]
struct MembershipSnapshot {
    /// Index in the joined list, if a member
    position: Option<usize>,
    is_joined: Option<bool>,
}

fn set_member(joined_ids: &mut Vec<String>, community_id: &str, member: bool) {
    if member {
        if !joined_ids.iter().any(|id| id == community_id) {
            joined_ids.push(community_id.to_string());
        }
    } else {
        joined_ids.retain(|id| id != community_id);
    }
}

/// Join or leave. The persisted copy is written in the same transition as
/// the in-memory change, on apply and on restore alike.
struct MembershipPatch {
    community_id: String,
    join: bool,
    prefs: Arc<PreferenceStore>,
}

impl MembershipPatch {
    fn set_flag(&self, state: &mut CommunitiesState, is_joined: bool) {
        if let Some(community) = state
            .communities
            .iter_mut()
            .find(|c| c.id == self.community_id)
        {
            community.is_joined = is_joined;
        }
    }
}

impl OptimisticPatch<CommunitiesState> for MembershipPatch {
    type Snapshot = MembershipSnapshot;

    fn key(&self) -> MutationKey {
        let action = if self.join { ActionKind::Join } else { ActionKind::Leave };
        MutationKey::new(self.community_id.clone(), action)
    }

    fn is_noop(&self, state: &CommunitiesState) -> bool {
        state.is_member(&self.community_id) == self.join
    }

    fn snapshot(&self, state: &CommunitiesState) -> MembershipSnapshot {
        MembershipSnapshot {
            position: state.joined_ids.iter().position(|id| *id == self.community_id),
            is_joined: state.community(&self.community_id).map(|c| c.is_joined),
        }
    }

    fn apply(&self, state: &mut CommunitiesState) {
        set_member(&mut state.joined_ids, &self.community_id, self.join);
        self.set_flag(state, self.join);
        persist_membership(&self.prefs, &state.joined_ids);
    }

    fn restore(&self, state: &mut CommunitiesState, snapshot: MembershipSnapshot) {
        state.joined_ids.retain(|id| *id != self.community_id);
        if let Some(position) = snapshot.position {
            let position = position.min(state.joined_ids.len());
            state.joined_ids.insert(position, self.community_id.clone());
        }
        if let Some(is_joined) = snapshot.is_joined {
            self.set_flag(state, is_joined);
        }
        persist_membership(&self.prefs, &state.joined_ids);
    }
}

/// Community listing and the viewer's membership set.
pub struct CommunityStore<R> {
    remote: Arc<R>,
    prefs: Arc<PreferenceStore>,
    container: StateContainer<CommunitiesState>,
    engine: MutationEngine,
}

impl<R: RemoteClient> CommunityStore<R> {
    /// Membership is read from the preference store once, here.
    pub fn new(remote: Arc<R>, prefs: Arc<PreferenceStore>) -> Self {
        let joined_ids = prefs.joined_communities();
        Self {
            remote,
            prefs,
            container: StateContainer::new(CommunitiesState {
                communities: Vec::new(),
                joined_ids,
            }),
            engine: MutationEngine::new("communities"),
        }
    }

    pub fn container(&self) -> &StateContainer<CommunitiesState> {
        &self.container
    }

    pub fn get_state(&self) -> CommunitiesState {
        self.container.get_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<CommunitiesState> {
        self.container.subscribe()
    }

    /// Load the listing; `is_joined` is mirrored from the membership set.
    pub fn set_communities(&self, communities: Vec<Community>) {
        self.container.dispatch(|state| {
            state.communities = communities;
            state.mirror_membership();
        });
    }

    /// Replace the membership set, e.g. from a server-side membership list.
    pub fn set_membership(&self, joined_ids: Vec<String>) {
        let joined_ids = dedup(joined_ids);
        self.container.dispatch(|state| {
            state.joined_ids = joined_ids;
            state.mirror_membership();
            persist_membership(&self.prefs, &state.joined_ids);
        });
    }

    pub fn is_member(&self, community_id: &str) -> bool {
        self.container.read(|s| s.is_member(community_id))
    }

    pub fn joined_ids(&self) -> Vec<String> {
        self.container.read(|s| s.joined_ids.clone())
    }

    pub fn community(&self, community_id: &str) -> Option<Community> {
        self.container.read(|s| s.community(community_id).cloned())
    }

    pub fn phase(&self, community_id: &str, action: ActionKind) -> MutationPhase {
        self.engine.phase(&MutationKey::new(community_id, action))
    }

    /// Joining a community already in the set is a no-op with no remote call.
    pub async fn join_community(
        &self,
        community_id: &str,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.join_community_with(community_id, Callbacks::default()).await
    }

    pub async fn join_community_with(
        &self,
        community_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = MembershipPatch {
            community_id: community_id.to_string(),
            join: true,
            prefs: self.prefs.clone(),
        };
        let remote = self.remote.join_community(community_id);
        self.engine
            .run_with(&self.container, patch, remote, callbacks)
            .await
    }

    pub async fn leave_community(
        &self,
        community_id: &str,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.leave_community_with(community_id, Callbacks::default()).await
    }

    pub async fn leave_community_with(
        &self,
        community_id: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = MembershipPatch {
            community_id: community_id.to_string(),
            join: false,
            prefs: self.prefs.clone(),
        };
        let remote = self.remote.leave_community(community_id);
        self.engine
            .run_with(&self.container, patch, remote, callbacks)
            .await
    }

    /// Reset for logout, including the persisted membership
    pub fn clear(&self) {
        self.container.replace(CommunitiesState::default());
        persist_membership(&self.prefs, &[]);
    }
}
