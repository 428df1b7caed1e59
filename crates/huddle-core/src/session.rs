use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{FixedOffset, Offset, Utc};

use crate::config::CoreConfig;
use crate::error::SyncError;
use crate::remote::{HttpRemoteClient, RemoteClient, RemoteResult, SessionInfo};
use crate::store::{ChatReconciler, CommunityStore, EventStore, FeedStore, PreferenceStore};

/// One signed-in session: every store, wired to a shared remote client and
/// preference store.
pub struct SyncSession<R> {
    pub events: EventStore<R>,
    pub communities: CommunityStore<R>,
    pub feed: FeedStore<R>,
    pub chat: ChatReconciler<R>,
    remote: Arc<R>,
    prefs: Arc<PreferenceStore>,
    session_check_timeout: Duration,
}

impl SyncSession<HttpRemoteClient> {
    /// Build the HTTP client and open the preference file under `data_dir`.
    pub fn connect(config: &CoreConfig) -> Result<Self> {
        let remote = HttpRemoteClient::new(config).context("Failed to create API client")?;
        let prefs = PreferenceStore::open(config.preferences_path());
        tracing::info!("Session connected to {}", config.api_base_url);
        Ok(Self::new(Arc::new(remote), Arc::new(prefs), config))
    }
}

impl<R: RemoteClient> SyncSession<R> {
    pub fn new(remote: Arc<R>, prefs: Arc<PreferenceStore>, config: &CoreConfig) -> Self {
        let offset = FixedOffset::east_opt(config.display_utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| {
            tracing::warn!(
                "display offset of {} minutes out of range, using UTC",
                config.display_utc_offset_minutes
            );
            Utc.fix()
        });

        Self {
            events: EventStore::new(remote.clone()),
            communities: CommunityStore::new(remote.clone(), prefs.clone()),
            feed: FeedStore::new(remote.clone()),
            chat: ChatReconciler::new(remote.clone(), offset),
            remote,
            prefs,
            session_check_timeout: config.session_check_timeout(),
        }
    }

    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    pub fn preferences(&self) -> &Arc<PreferenceStore> {
        &self.prefs
    }

    /// Ask the server who is signed in. Gives up after the configured
    /// session-check timeout.
    pub async fn check_session(&self) -> RemoteResult<SessionInfo> {
        match tokio::time::timeout(self.session_check_timeout, self.remote.check_session()).await {
            Ok(Ok(info)) => {
                tracing::info!("Session valid for user {}", info.user_id);
                Ok(info)
            }
            Ok(Err(e)) => {
                tracing::warn!("Session check failed: {}", e);
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    "Session check timed out after {}ms",
                    self.session_check_timeout.as_millis()
                );
                Err(SyncError::Transport("session check timed out".to_string()))
            }
        }
    }

    /// Logout: drop every list and forget the persisted membership.
    pub fn reset(&self) {
        self.events.clear();
        self.communities.clear();
        self.feed.clear();
        self.chat.clear();
        tracing::info!("Session state cleared");
    }
}
