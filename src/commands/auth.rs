//! Authentication commands: browser login, logout, status.

use clap::{Args, Subcommand};
use tasklink_core::{AuthState, AuthorizeOutcome, TokenManager};

use crate::app::{self, SetupError};
use crate::config::Config;

/// Authentication commands
#[derive(Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    command: AuthSubcommand,
}

#[derive(Subcommand)]
enum AuthSubcommand {
    /// Authorize tasklink with your Google account
    Login,
    /// Forget stored tokens
    Logout,
    /// Show authentication status
    Status,
}

impl AuthCommand {
    pub fn run(&self, config: &Config) -> Result<(), AuthCommandError> {
        let manager = app::token_manager(config)?;
        let rt = app::runtime()?;

        match &self.command {
            AuthSubcommand::Login => rt.block_on(login(&manager, config)),
            AuthSubcommand::Logout => logout(&manager),
            AuthSubcommand::Status => rt.block_on(status(&manager, config)),
        }
    }
}

async fn login(manager: &TokenManager, config: &Config) -> Result<(), AuthCommandError> {
    if manager.initialize().await? == AuthState::Authenticated {
        println!("Already authenticated. Run 'tasklink auth logout' first to switch accounts.");
        return Ok(());
    }

    println!(
        "Waiting for authorization (timeout: {} seconds)",
        config.auth_timeout_secs.value
    );
    match manager.authorize().await? {
        AuthorizeOutcome::Authorized => {
            println!("Authenticated. Tokens saved to {}", config.data_dir.value.display());
        }
        AuthorizeOutcome::AlreadyInProgress => {
            println!("An authorization is already in progress.");
        }
    }
    Ok(())
}

fn logout(manager: &TokenManager) -> Result<(), AuthCommandError> {
    manager.clear()?;
    println!("Logged out. Stored tokens removed.");
    Ok(())
}

async fn status(manager: &TokenManager, config: &Config) -> Result<(), AuthCommandError> {
    println!("Authentication");
    println!("==============");
    println!();

    let state = manager.initialize().await?;
    println!("Status:   {}", state);
    println!("Tokens:   {}", config.data_dir.value.display());
    if let Some(tokens) = manager.tokens() {
        println!(
            "Expires:  {}",
            tokens.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        println!(
            "Refresh:  {}",
            if tokens.refresh_token.is_some() {
                "available"
            } else {
                "missing"
            }
        );
    } else {
        println!();
        println!("Run 'tasklink auth login' to authorize.");
    }
    Ok(())
}

/// Errors from auth commands
#[derive(Debug)]
pub enum AuthCommandError {
    Setup(SetupError),
    Auth(tasklink_core::AuthError),
}

impl std::fmt::Display for AuthCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthCommandError::Setup(e) => write!(f, "{}", e),
            AuthCommandError::Auth(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AuthCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthCommandError::Setup(e) => Some(e),
            AuthCommandError::Auth(e) => Some(e),
        }
    }
}

impl From<SetupError> for AuthCommandError {
    fn from(e: SetupError) -> Self {
        AuthCommandError::Setup(e)
    }
}

impl From<tasklink_core::AuthError> for AuthCommandError {
    fn from(e: tasklink_core::AuthError) -> Self {
        AuthCommandError::Auth(e)
    }
}
