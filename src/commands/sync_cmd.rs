//! One-shot sync of reminders to Google Tasks.

use clap::Args;
use tasklink_core::AuthState;

use crate::app::{self, SetupError};
use crate::config::Config;

/// Run one sync pass
#[derive(Debug, Args)]
pub struct SyncCommand {}

impl SyncCommand {
    pub fn run(&self, config: &Config) -> Result<(), SyncCommandError> {
        if !config.enabled.value {
            println!("Sync is disabled (enabled: false).");
            return Ok(());
        }

        let manager = app::token_manager(config)?;
        let rt = app::runtime()?;
        rt.block_on(async {
            if manager.initialize().await? != AuthState::Authenticated {
                return Err(SyncCommandError::NotAuthenticated);
            }

            println!(
                "Syncing reminders from {} to '{}'...",
                config.notes_dir.value.display(),
                config.list_name.value
            );
            let engine = app::engine(config, manager);
            let outcome = engine.run_pass().await?;
            if outcome.errored > 0 {
                return Err(SyncCommandError::ItemsFailed(outcome.errored));
            }
            Ok(())
        })
    }
}

/// Errors from sync and watch commands
#[derive(Debug)]
pub enum SyncCommandError {
    Setup(SetupError),
    NotAuthenticated,
    Sync(tasklink_core::Error),
    ItemsFailed(usize),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::Setup(e) => write!(f, "{}", e),
            SyncCommandError::NotAuthenticated => {
                write!(f, "Not authenticated. Run 'tasklink auth login' first.")
            }
            SyncCommandError::Sync(e) => write!(f, "Sync failed: {}", e),
            SyncCommandError::ItemsFailed(count) => {
                write!(f, "{} reminder(s) could not be synced; see log for details", count)
            }
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::Setup(e) => Some(e),
            SyncCommandError::Sync(e) => Some(e),
            SyncCommandError::NotAuthenticated | SyncCommandError::ItemsFailed(_) => None,
        }
    }
}

impl From<SetupError> for SyncCommandError {
    fn from(e: SetupError) -> Self {
        SyncCommandError::Setup(e)
    }
}

impl From<tasklink_core::Error> for SyncCommandError {
    fn from(e: tasklink_core::Error) -> Self {
        SyncCommandError::Sync(e)
    }
}

impl From<tasklink_core::AuthError> for SyncCommandError {
    fn from(e: tasklink_core::AuthError) -> Self {
        SyncCommandError::Sync(e.into())
    }
}
