use std::sync::Arc;

use tokio::sync::watch;

use super::container::StateContainer;
use super::engine::{
    ActionKind, Callbacks, InsertPatch, MutationEngine, MutationKey, MutationOutcome,
    MutationPhase, OptimisticPatch,
};
use crate::error::SyncError;
use crate::models::{
    find_by_id, generate_temp_id, remove_by_id, replace_by_id, FeedPost, NewPost,
};
use crate::remote::RemoteClient;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedState {
    pub posts: Vec<FeedPost>,
}

impl FeedState {
    pub fn post(&self, post_id: &str) -> Option<&FeedPost> {
        find_by_id(&self.posts, post_id)
    }
}

struct ReactionPatch {
    post_id: String,
    emoji: String,
}

impl OptimisticPatch<FeedState> for ReactionPatch {
    /// The whole post record: counts and the viewer's own reactions
    type Snapshot = Option<FeedPost>;

    fn key(&self) -> MutationKey {
        MutationKey::new(self.post_id.clone(), ActionKind::React(self.emoji.clone()))
    }

    fn is_noop(&self, state: &FeedState) -> bool {
        state.post(&self.post_id).is_none()
    }

    fn snapshot(&self, state: &FeedState) -> Option<FeedPost> {
        state.post(&self.post_id).cloned()
    }

    fn apply(&self, state: &mut FeedState) {
        if let Some(post) = state.posts.iter_mut().find(|p| p.id == self.post_id) {
            post.toggle_reaction(&self.emoji);
        }
    }

    fn restore(&self, state: &mut FeedState, snapshot: Option<FeedPost>) {
        if let Some(post) = snapshot {
            replace_by_id(&mut state.posts, &self.post_id, post);
        }
    }
}

struct PostPlaceholder {
    temp_id: String,
    draft: NewPost,
    author_name: String,
}

impl InsertPatch<FeedState, FeedPost> for PostPlaceholder {
    fn temp_id(&self) -> &str {
        &self.temp_id
    }

    fn insert(&self, state: &mut FeedState) {
        let placeholder = FeedPost::placeholder(self.temp_id.clone(), &self.draft, &self.author_name);
        state.posts.insert(0, placeholder);
    }

    fn reconcile(&self, state: &mut FeedState, confirmed: &FeedPost) {
        let mut confirmed = confirmed.clone();
        confirmed.pending = false;
        replace_by_id(&mut state.posts, &self.temp_id, confirmed);
    }

    fn discard(&self, state: &mut FeedState) {
        remove_by_id(&mut state.posts, &self.temp_id);
    }
}

pub struct FeedStore<R> {
    remote: Arc<R>,
    container: StateContainer<FeedState>,
    engine: MutationEngine,
}

impl<R: RemoteClient> FeedStore<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self {
            remote,
            container: StateContainer::new(FeedState::default()),
            engine: MutationEngine::new("feed"),
        }
    }

    pub fn container(&self) -> &StateContainer<FeedState> {
        &self.container
    }

    pub fn get_state(&self) -> FeedState {
        self.container.get_state()
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.container.subscribe()
    }

    pub fn set_posts(&self, posts: Vec<FeedPost>) {
        self.container.replace(FeedState { posts });
    }

    pub fn post(&self, post_id: &str) -> Option<FeedPost> {
        self.container.read(|s| s.post(post_id).cloned())
    }

    pub fn phase(&self, post_id: &str, emoji: &str) -> MutationPhase {
        self.engine
            .phase(&MutationKey::new(post_id, ActionKind::React(emoji.to_string())))
    }

    /// Add the viewer's reaction, or take it back if already present.
    /// Posts not in the feed are skipped without a remote call.
    pub async fn toggle_reaction(
        &self,
        post_id: &str,
        emoji: &str,
    ) -> Result<MutationOutcome<()>, SyncError> {
        self.toggle_reaction_with(post_id, emoji, Callbacks::default())
            .await
    }

    pub async fn toggle_reaction_with(
        &self,
        post_id: &str,
        emoji: &str,
        callbacks: Callbacks<'_, ()>,
    ) -> Result<MutationOutcome<()>, SyncError> {
        let patch = ReactionPatch {
            post_id: post_id.to_string(),
            emoji: emoji.to_string(),
        };
        let remote = self.remote.react_to_post(post_id, emoji);
        self.engine
            .run_with(&self.container, patch, remote, callbacks)
            .await
    }

    pub async fn create_post(&self, draft: NewPost, author_name: &str) -> Result<FeedPost, SyncError> {
        draft.validate()?;
        let remote = self.remote.create_post(&draft);
        let patch = PostPlaceholder {
            temp_id: generate_temp_id(),
            draft: draft.clone(),
            author_name: author_name.to_string(),
        };
        self.engine.run_insert(&self.container, patch, remote).await
    }

    pub fn remove_post(&self, post_id: &str) -> bool {
        self.container
            .dispatch(|state| remove_by_id(&mut state.posts, post_id))
    }

    pub fn clear(&self) {
        self.container.replace(FeedState::default());
    }
}
