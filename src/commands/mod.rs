mod auth;
mod config_cmd;
mod sync_cmd;
mod watch;

pub use auth::AuthCommand;
pub use config_cmd::ConfigCommand;
pub use sync_cmd::SyncCommand;
pub use watch::WatchCommand;
