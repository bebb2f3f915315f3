//! Tasklink Core Library
//!
//! OAuth2 token lifecycle and one-way reconciliation of local reminders with
//! Google Tasks.

pub mod api;
pub mod auth;
pub mod checklist;
pub mod checksum;
pub mod driver;
pub mod error;
mod flight;
pub mod metadata;
pub mod model;
pub mod reconcile;

pub use api::{AccessTokenProvider, RetryPolicy, TaskService, TasksClient};
pub use auth::{
    AuthState, AuthorizeOutcome, BrowserLauncher, FileTokenStore, OAuthConfig, TokenManager,
    TokenSet, TokenStore,
};
pub use driver::SyncDriver;
pub use error::{AuthError, Error, Result};
pub use metadata::MetadataParse;
pub use model::{Due, ItemLocation, LinkMetadata, ReminderItem, RemoteTask, TaskPayload, TaskStatus};
pub use reconcile::{LogSink, ReconcileEngine, ReminderStore, StatusSink, SyncOutcome};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
