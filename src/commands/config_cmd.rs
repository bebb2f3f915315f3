use std::path::{Path, PathBuf};

use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# tasklink configuration

# Set to false to turn sync and watch into no-ops
enabled: true

# Google Tasks list that receives reminders (created if missing)
list_name: Reminders

# Directory scanned for Markdown checklists, e.g. "- [ ] Buy milk due:2024-01-01"
# notes_dir: ~/notes

# Seconds between passes in 'tasklink watch' (minimum 60)
poll_interval_secs: 300

# Local port for the OAuth redirect; 0 picks a free port
callback_port: 0

# Seconds to wait for the browser authorization
auth_timeout_secs: 300

# OAuth client from the Google Cloud console (Desktop app)
oauth:
  client_id: ""
  # client_secret: ""
"#;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Write a commented config file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<PathBuf>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_text(config),
                }
                Ok(())
            }
            ConfigSubcommand::Init { force } => {
                let path = config_path.unwrap_or_else(Config::default_config_path);
                write_template(&path, *force)?;
                println!("Wrote {}", path.display());
                Ok(())
            }
        }
    }
}

fn print_text(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("enabled: {}", config.enabled.value);
    println!("  source: {}", config.enabled.source);
    println!("list_name: {}", config.list_name.value);
    println!("  source: {}", config.list_name.source);
    println!("notes_dir: {}", config.notes_dir.value.display());
    println!("  source: {}", config.notes_dir.source);
    println!("data_dir: {}", config.data_dir.value.display());
    println!("  source: {}", config.data_dir.source);
    println!("callback_port: {}", config.callback_port.value);
    println!("  source: {}", config.callback_port.source);
    println!("poll_interval_secs: {}", config.poll_interval_secs.value);
    println!("  source: {}", config.poll_interval_secs.source);
    println!("auth_timeout_secs: {}", config.auth_timeout_secs.value);
    println!("  source: {}", config.auth_timeout_secs.source);
    println!();

    println!(
        "oauth.client_id: {}",
        config.oauth.client_id.as_deref().unwrap_or("(not set)")
    );
    println!(
        "oauth.client_secret: {}",
        if config.oauth.client_secret.is_some() {
            "(set)"
        } else {
            "(not set)"
        }
    );
}

fn write_template(path: &Path, force: bool) -> std::io::Result<()> {
    if path.exists() && !force {
        return Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists (use --force to overwrite)", path.display()),
        ));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, CONFIG_TEMPLATE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSource;
    use tempfile::tempdir;

    #[test]
    fn test_template_loads_as_config() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.yaml");
        write_template(&path, false).unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.list_name.value, "Reminders");
        assert_eq!(config.list_name.source, ConfigSource::File);
        assert_eq!(config.poll_interval_secs.value, 300);
    }

    #[test]
    fn test_template_refuses_to_overwrite() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "list_name: Mine\n").unwrap();

        assert!(write_template(&path, false).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "list_name: Mine\n");

        write_template(&path, true).unwrap();
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .contains("tasklink configuration"));
    }
}
