use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    fn set(&mut self, value: T, source: ConfigSource) {
        self.value = value;
        self.source = source;
    }
}

/// OAuth client registered with Google
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OAuthSettings {
    pub client_id: Option<String>,
    /// Never printed by `config show`
    #[serde(skip_serializing)]
    pub client_secret: Option<String>,
}

impl OAuthSettings {
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

pub const DEFAULT_LIST_NAME: &str = "Reminders";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_AUTH_TIMEOUT_SECS: u64 = 300;

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Master switch for sync and watch
    pub enabled: ConfigValue<bool>,
    /// Remote task list that receives reminders
    pub list_name: ConfigValue<String>,
    /// Directory scanned for Markdown checklists
    pub notes_dir: ConfigValue<PathBuf>,
    /// Directory holding tokens.json and auth_session.json
    pub data_dir: ConfigValue<PathBuf>,
    /// Local port for the OAuth redirect; 0 picks a free port
    pub callback_port: ConfigValue<u16>,
    pub poll_interval_secs: ConfigValue<u64>,
    pub auth_timeout_secs: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub oauth: OAuthSettings,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    enabled: Option<bool>,
    list_name: Option<String>,
    notes_dir: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    callback_port: Option<u16>,
    poll_interval_secs: Option<u64>,
    auth_timeout_secs: Option<u64>,
    oauth: Option<OAuthSettings>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut enabled = ConfigValue::new(true, ConfigSource::Default);
        let mut list_name = ConfigValue::new(DEFAULT_LIST_NAME.to_string(), ConfigSource::Default);
        let mut notes_dir = ConfigValue::new(Self::default_notes_dir(), ConfigSource::Default);
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut callback_port = ConfigValue::new(0, ConfigSource::Default);
        let mut poll_interval_secs =
            ConfigValue::new(DEFAULT_POLL_INTERVAL_SECS, ConfigSource::Default);
        let mut auth_timeout_secs =
            ConfigValue::new(DEFAULT_AUTH_TIMEOUT_SECS, ConfigSource::Default);
        let mut config_file = None;
        let mut oauth = OAuthSettings::default();

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(value) = file_config.enabled {
                enabled.set(value, ConfigSource::File);
            }
            if let Some(value) = file_config.list_name {
                list_name.set(value, ConfigSource::File);
            }
            if let Some(dir) = file_config.notes_dir {
                notes_dir.set(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(dir) = file_config.data_dir {
                data_dir.set(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(port) = file_config.callback_port {
                callback_port.set(port, ConfigSource::File);
            }
            if let Some(secs) = file_config.poll_interval_secs {
                poll_interval_secs.set(secs, ConfigSource::File);
            }
            if let Some(secs) = file_config.auth_timeout_secs {
                auth_timeout_secs.set(secs, ConfigSource::File);
            }
            if let Some(settings) = file_config.oauth {
                oauth = settings;
            }
        }

        // Apply environment variable overrides
        if let Ok(value) = std::env::var("TASKLINK_ENABLED") {
            enabled.set(parse_env("TASKLINK_ENABLED", &value)?, ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("TASKLINK_LIST_NAME") {
            list_name.set(value, ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("TASKLINK_NOTES_DIR") {
            notes_dir.set(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("TASKLINK_DATA_DIR") {
            data_dir.set(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(value) = std::env::var("TASKLINK_CALLBACK_PORT") {
            callback_port.set(
                parse_env("TASKLINK_CALLBACK_PORT", &value)?,
                ConfigSource::Environment,
            );
        }
        if let Ok(value) = std::env::var("TASKLINK_POLL_INTERVAL_SECS") {
            poll_interval_secs.set(
                parse_env("TASKLINK_POLL_INTERVAL_SECS", &value)?,
                ConfigSource::Environment,
            );
        }
        if let Ok(value) = std::env::var("TASKLINK_AUTH_TIMEOUT_SECS") {
            auth_timeout_secs.set(
                parse_env("TASKLINK_AUTH_TIMEOUT_SECS", &value)?,
                ConfigSource::Environment,
            );
        }
        if let Ok(id) = std::env::var("TASKLINK_CLIENT_ID") {
            oauth.client_id = Some(id);
        }
        if let Ok(secret) = std::env::var("TASKLINK_CLIENT_SECRET") {
            oauth.client_secret = Some(secret);
        }

        Ok(Self {
            enabled,
            list_name,
            notes_dir,
            data_dir,
            callback_port,
            poll_interval_secs,
            auth_timeout_secs,
            config_file,
            oauth,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.value)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs.value)
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/tasklink/
    /// - macOS: ~/Library/Application Support/tasklink/
    /// - Windows: %APPDATA%/tasklink/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasklink")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/tasklink/
    /// - macOS: ~/Library/Application Support/tasklink/
    /// - Windows: %APPDATA%/tasklink/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tasklink")
    }

    /// Default notes directory: ~/notes
    pub fn default_notes_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notes")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Relative paths in the config file are relative to the file itself.
fn resolve_relative(config_path: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_relative() {
        config_path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
    } else {
        dir
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv(name.to_string(), value.to_string()))
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidEnv(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidEnv(name, value) => {
                write!(f, "Invalid value for {}: '{}'", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.enabled.value);
        assert_eq!(config.list_name.value, "Reminders");
        assert_eq!(config.list_name.source, ConfigSource::Default);
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.auth_timeout(), Duration::from_secs(300));
        assert!(config.data_dir.value.ends_with("tasklink"));
        assert!(config.config_file.is_none());
        assert!(!config.oauth.is_configured());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "list_name: Inbox").unwrap();
        writeln!(file, "notes_dir: /home/me/notes").unwrap();
        writeln!(file, "callback_port: 8085").unwrap();
        writeln!(file, "enabled: false").unwrap();
        writeln!(file, "oauth:").unwrap();
        writeln!(file, "  client_id: abc.apps.googleusercontent.com").unwrap();
        writeln!(file, "  client_secret: shh").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.list_name.value, "Inbox");
        assert_eq!(config.list_name.source, ConfigSource::File);
        assert_eq!(config.notes_dir.value, PathBuf::from("/home/me/notes"));
        assert_eq!(config.callback_port.value, 8085);
        assert!(!config.enabled.value);
        assert!(config.oauth.is_configured());
        assert_eq!(config.oauth.client_secret.as_deref(), Some("shh"));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_dirs_resolve_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "notes_dir: notes\ndata_dir: state\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.notes_dir.value, temp_dir.path().join("notes"));
        assert_eq!(config.data_dir.value, temp_dir.path().join("state"));
    }

    #[test]
    fn test_secret_is_not_serialized() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "oauth:\n  client_id: id\n  client_secret: shh\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"client_id\":\"id\""));
        assert!(!json.contains("shh"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "list_name: fromfile").unwrap();

        std::env::set_var("TASKLINK_LIST_NAME", "fromenv");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.list_name.value, "fromenv");
        assert_eq!(config.list_name.source, ConfigSource::Environment);

        std::env::remove_var("TASKLINK_LIST_NAME");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_partial_file_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "poll_interval_secs: 600\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.poll_interval_secs.value, 600);
        assert_eq!(config.poll_interval_secs.source, ConfigSource::File);
        assert_eq!(config.list_name.source, ConfigSource::Default);
    }
}
