//! Wiring between the configuration and the core services.

use std::sync::Arc;

use tasklink_core::auth::FileTokenStore;
use tasklink_core::{
    AuthError, BrowserLauncher, OAuthConfig, ReconcileEngine, StatusSink, TasksClient,
    TokenManager,
};

use crate::config::Config;
use crate::store::MarkdownStore;

pub type Engine = ReconcileEngine<TasksClient<TokenManager>, MarkdownStore>;

/// Opens URLs with the platform's default browser.
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), AuthError> {
        println!("Opening your browser to authorize tasklink...");
        println!("If it does not open, visit:\n\n  {}\n", url);
        open::that(url).map_err(|e| AuthError::Browser(e.to_string()))
    }
}

/// Prints status messages to stdout.
pub struct TerminalSink;

impl StatusSink for TerminalSink {
    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

/// Builds the token manager; fails if no OAuth client is configured.
pub fn token_manager(config: &Config) -> Result<TokenManager, SetupError> {
    let client_id = config
        .oauth
        .client_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or(SetupError::NotConfigured)?;

    let oauth = OAuthConfig {
        client_secret: config.oauth.client_secret.clone(),
        auth_timeout: config.auth_timeout(),
        ..OAuthConfig::google(client_id, config.callback_port.value)
    };
    let store = Arc::new(FileTokenStore::new(config.data_dir.value.clone()));
    Ok(TokenManager::new(oauth, store, Arc::new(SystemBrowser)))
}

/// Builds the reconciliation engine over the configured notes directory.
pub fn engine(config: &Config, tokens: TokenManager) -> Engine {
    let store = MarkdownStore::new(config.notes_dir.value.clone());
    ReconcileEngine::new(TasksClient::new(tokens), store, config.list_name.value.clone())
        .with_sink(Arc::new(TerminalSink))
}

pub fn runtime() -> Result<tokio::runtime::Runtime, SetupError> {
    tokio::runtime::Runtime::new().map_err(SetupError::Runtime)
}

/// Errors raised before a command can do its work
#[derive(Debug)]
pub enum SetupError {
    /// No OAuth client id
    NotConfigured,
    /// Tokio runtime could not start
    Runtime(std::io::Error),
}

impl std::fmt::Display for SetupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SetupError::NotConfigured => write!(
                f,
                "OAuth client not configured. Set oauth.client_id in config or TASKLINK_CLIENT_ID."
            ),
            SetupError::Runtime(e) => write!(f, "Failed to create runtime: {}", e),
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Runtime(e) => Some(e),
            SetupError::NotConfigured => None,
        }
    }
}
