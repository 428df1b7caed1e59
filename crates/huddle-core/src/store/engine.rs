//! Optimistic apply / rollback protocol shared by every store.
//!
//! A toggle mutation goes `Idle -> [Queued ->] Pending -> Committed | RolledBack -> Idle`,
//! tracked per `(entity_id, action)`:
//!
//! 1. an identical mutation already in flight makes the call a no-op;
//! 2. mutations on the same entity run one at a time, in call order;
//! 3. the patch snapshots what it touches, then applies, in one dispatch;
//! 4. the remote call is awaited;
//! 5. success keeps the optimistic state, failure restores the snapshot and
//!    returns the error.
//!
//! Insertion mutations (create, chat send) skip the snapshot: the placeholder
//! is reconciled in place on success and deleted by temporary id on failure.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::container::StateContainer;
use crate::error::SyncError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Join,
    Leave,
    Save,
    Unsave,
    React(String),
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Join => write!(f, "join"),
            ActionKind::Leave => write!(f, "leave"),
            ActionKind::Save => write!(f, "save"),
            ActionKind::Unsave => write!(f, "unsave"),
            ActionKind::React(emoji) => write!(f, "react:{}", emoji),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
    pub entity_id: String,
    pub action: ActionKind,
}

impl MutationKey {
    pub fn new(entity_id: impl Into<String>, action: ActionKind) -> Self {
        Self {
            entity_id: entity_id.into(),
            action,
        }
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_id, self.action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    /// Waiting for an earlier mutation on the same entity to settle
    Queued,
    Pending,
    Committed,
    RolledBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The same (entity, action) is already in flight
    AlreadyPending,
    /// The patch's state guard found nothing to change
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome<T> {
    Committed(T),
    Skipped(SkipReason),
}

impl<T> MutationOutcome<T> {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, MutationOutcome::Skipped(_))
    }
}

/// A reversible local change to state `S`.
pub trait OptimisticPatch<S> {
    /// Exact copy of whatever `apply` touches
    type Snapshot;

    fn key(&self) -> MutationKey;

    /// State guard. Returning true skips the mutation without a remote call.
    fn is_noop(&self, _state: &S) -> bool {
        false
    }

    fn snapshot(&self, state: &S) -> Self::Snapshot;

    fn apply(&self, state: &mut S);

    fn restore(&self, state: &mut S, snapshot: Self::Snapshot);
}

/// A placeholder entity inserted under a temporary id until the server answers.
pub trait InsertPatch<S, T> {
    fn temp_id(&self) -> &str;

    fn insert(&self, state: &mut S);

    /// Swap the placeholder for the authoritative record, keeping its position.
    fn reconcile(&self, state: &mut S, confirmed: &T);

    /// Delete the placeholder by temporary id.
    fn discard(&self, state: &mut S);
}

/// Optional hooks fired after a toggle settles.
pub struct Callbacks<'a, T> {
    on_success: Option<Box<dyn FnOnce(&T) + Send + 'a>>,
    on_error: Option<Box<dyn FnOnce(&SyncError) + Send + 'a>>,
}

impl<T> Default for Callbacks<'_, T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<'a, T> Callbacks<'a, T> {
    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&SyncError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

pub struct MutationEngine {
    label: &'static str,
    phases: Mutex<HashMap<MutationKey, MutationPhase>>,
    entity_locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Marks a key in flight; clears it on drop, including when the caller
/// abandons the future.
struct InFlight<'a> {
    engine: &'a MutationEngine,
    key: MutationKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.engine.phases.lock().remove(&self.key);
    }
}

/// Exclusive turn on one entity.
struct EntityTurn<'a> {
    engine: &'a MutationEngine,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EntityTurn<'_> {
    fn drop(&mut self) {
        self.guard.take();
        // Drop locks nobody else is holding or waiting on
        self.engine
            .entity_locks
            .lock()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

/// Undoes an optimistic change when dropped armed, which happens when the
/// caller drops the mutation future before the remote call settles.
struct Undo<F: FnOnce()> {
    undo: Option<F>,
}

impl<F: FnOnce()> Undo<F> {
    fn new(undo: F) -> Self {
        Self { undo: Some(undo) }
    }

    /// The remote call succeeded; keep the optimistic state
    fn disarm(mut self) {
        self.undo = None;
    }

    fn now(mut self) {
        if let Some(undo) = self.undo.take() {
            undo();
        }
    }
}

impl<F: FnOnce()> Drop for Undo<F> {
    fn drop(&mut self) {
        if let Some(undo) = self.undo.take() {
            tracing::debug!("mutation dropped before settling, undoing local change");
            undo();
        }
    }
}

impl MutationEngine {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            phases: Mutex::new(HashMap::new()),
            entity_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn phase(&self, key: &MutationKey) -> MutationPhase {
        self.phases
            .lock()
            .get(key)
            .copied()
            .unwrap_or(MutationPhase::Idle)
    }

    pub fn in_flight_count(&self) -> usize {
        self.phases.lock().len()
    }

    pub async fn run<S, P, T, Fut>(
        &self,
        container: &StateContainer<S>,
        patch: P,
        remote: Fut,
    ) -> Result<MutationOutcome<T>, SyncError>
    where
        S: Clone,
        P: OptimisticPatch<S>,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        self.run_with(container, patch, remote, Callbacks::default())
            .await
    }

    pub async fn run_with<S, P, T, Fut>(
        &self,
        container: &StateContainer<S>,
        patch: P,
        remote: Fut,
        callbacks: Callbacks<'_, T>,
    ) -> Result<MutationOutcome<T>, SyncError>
    where
        S: Clone,
        P: OptimisticPatch<S>,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        let key = patch.key();
        let Some(_in_flight) = self.claim(&key) else {
            tracing::debug!("[{}] {} already in flight, skipping", self.label, key);
            return Ok(MutationOutcome::Skipped(SkipReason::AlreadyPending));
        };

        let _turn = self.entity_turn(&key.entity_id).await;

        let snapshot = container.dispatch(|state| {
            if patch.is_noop(state) {
                return None;
            }
            let snapshot = patch.snapshot(state);
            patch.apply(state);
            Some(snapshot)
        });
        let Some(snapshot) = snapshot else {
            tracing::debug!("[{}] {} is a no-op", self.label, key);
            return Ok(MutationOutcome::Skipped(SkipReason::NoChange));
        };
        let undo = Undo::new(|| container.dispatch(|state| patch.restore(state, snapshot)));

        self.set_phase(&key, MutationPhase::Pending);
        tracing::debug!("[{}] {} pending", self.label, key);

        match remote.await {
            Ok(value) => {
                undo.disarm();
                self.set_phase(&key, MutationPhase::Committed);
                tracing::debug!("[{}] {} committed", self.label, key);
                if let Some(on_success) = callbacks.on_success {
                    on_success(&value);
                }
                Ok(MutationOutcome::Committed(value))
            }
            Err(err) => {
                undo.now();
                self.set_phase(&key, MutationPhase::RolledBack);
                tracing::warn!("[{}] {} rolled back: {}", self.label, key, err);
                if let Some(on_error) = callbacks.on_error {
                    on_error(&err);
                }
                Err(err)
            }
        }
    }

    pub async fn run_insert<S, P, T, Fut>(
        &self,
        container: &StateContainer<S>,
        patch: P,
        remote: Fut,
    ) -> Result<T, SyncError>
    where
        S: Clone,
        P: InsertPatch<S, T>,
        Fut: Future<Output = Result<T, SyncError>>,
    {
        container.dispatch(|state| patch.insert(state));
        let undo = Undo::new(|| container.dispatch(|state| patch.discard(state)));
        tracing::debug!("[{}] placeholder {} inserted", self.label, patch.temp_id());

        match remote.await {
            Ok(confirmed) => {
                undo.disarm();
                container.dispatch(|state| patch.reconcile(state, &confirmed));
                tracing::debug!("[{}] placeholder {} reconciled", self.label, patch.temp_id());
                Ok(confirmed)
            }
            Err(err) => {
                undo.now();
                tracing::warn!(
                    "[{}] placeholder {} discarded: {}",
                    self.label,
                    patch.temp_id(),
                    err
                );
                Err(err)
            }
        }
    }

    fn claim(&self, key: &MutationKey) -> Option<InFlight<'_>> {
        let mut phases = self.phases.lock();
        if phases.contains_key(key) {
            return None;
        }
        phases.insert(key.clone(), MutationPhase::Queued);
        Some(InFlight {
            engine: self,
            key: key.clone(),
        })
    }

    fn set_phase(&self, key: &MutationKey, phase: MutationPhase) {
        if let Some(slot) = self.phases.lock().get_mut(key) {
            *slot = phase;
        }
    }

    async fn entity_turn(&self, entity_id: &str) -> EntityTurn<'_> {
        let lock = self
            .entity_locks
            .lock()
            .entry(entity_id.to_string())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        EntityTurn {
            engine: self,
            guard: Some(guard),
        }
    }
}
