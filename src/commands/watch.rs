//! Periodic sync until interrupted.

use clap::Args;
use tasklink_core::{AuthState, SyncDriver};

use super::sync_cmd::SyncCommandError;
use crate::app;
use crate::config::Config;

/// Sync on a timer until Ctrl-C
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between passes (overrides poll_interval_secs; minimum 60)
    #[arg(long, short)]
    interval: Option<u64>,
}

impl WatchCommand {
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

            let interval = self
                .interval
                .map(std::time::Duration::from_secs)
                .unwrap_or_else(|| config.poll_interval());
            let driver = SyncDriver::new(app::engine(config, manager), interval);

            println!(
                "Watching {} every {}s. Press Ctrl-C to stop.",
                config.notes_dir.value.display(),
                driver.interval().as_secs()
            );
            driver
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                })
                .await;
            Ok(())
        })
    }
}
