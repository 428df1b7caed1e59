pub mod config;
pub mod error;
pub mod models;
pub mod notifications;
pub mod remote;
pub mod session;
pub mod store;
pub mod tracing_setup;

pub use config::CoreConfig;
pub use error::SyncError;
pub use notifications::{report, NotificationChannel, Severity};
pub use remote::{HttpRemoteClient, RemoteClient, RemoteResult, SessionInfo};
pub use session::SyncSession;
pub use tracing_setup::init_tracing;
