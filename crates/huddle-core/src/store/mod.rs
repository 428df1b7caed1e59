pub mod chat_store;
pub mod community_store;
pub mod container;
pub mod engine;
pub mod events_store;
pub mod feed_store;
pub mod preferences;

#[cfg(test)]
pub(crate) mod testing;

pub use chat_store::{merge_messages, ChatReconciler, ChatState};
pub use community_store::{CommunitiesState, CommunityStore};
pub use container::StateContainer;
pub use engine::{
    ActionKind, Callbacks, InsertPatch, MutationEngine, MutationKey, MutationOutcome,
    MutationPhase, OptimisticPatch, SkipReason,
};
pub use events_store::{EventStore, EventsState};
pub use feed_store::{FeedState, FeedStore};
pub use preferences::{PreferenceStore, PreferencesError};
