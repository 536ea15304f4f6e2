//! Configuration system for the `TaskDeck` client.
//!
//! Same layering as the server: CLI arguments beat environment variables
//! beat the TOML config file (`~/.config/taskdeck/config.toml`) beat
//! compiled defaults.

use std::path::PathBuf;

/// Errors that can occur when loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// Top-level TOML config file structure for the client.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ClientConfigFile {
    client: ClientFileSection,
}

/// `[client]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ClientFileSection {
    server_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

/// CLI arguments shared by every client subcommand.
#[derive(clap::Args, Debug, Default)]
pub struct ClientCliArgs {
    /// Server base URL.
    #[arg(short, long, env = "TASKDECK_SERVER")]
    pub server: Option<String>,

    /// Path to config file (default: `~/.config/taskdeck/config.toml`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Username to log in with.
    #[arg(short, long, env = "TASKDECK_USER")]
    pub username: Option<String>,

    /// Password to log in with.
    #[arg(short, long, env = "TASKDECK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "warn", env = "TASKDECK_LOG")]
    pub log_level: String,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., `http://127.0.0.1:8700`).
    pub server_url: String,
    /// Username to log in with.
    pub username: String,
    /// Password to log in with.
    pub password: String,
    /// Log level filter string.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8700".to_string(),
            username: "admin".to_string(),
            password: "1234".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read
    /// or parsed. A missing file at the default path is treated as empty.
    pub fn load(cli: &ClientCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &ClientCliArgs, file: &ClientConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            server_url: cli
                .server
                .clone()
                .or_else(|| file.client.server_url.clone())
                .unwrap_or(defaults.server_url),
            username: cli
                .username
                .clone()
                .or_else(|| file.client.username.clone())
                .unwrap_or(defaults.username),
            password: cli
                .password
                .clone()
                .or_else(|| file.client.password.clone())
                .unwrap_or(defaults.password),
            log_level: cli.log_level.clone(),
        }
    }
}

/// Load and parse a TOML config file for the client.
fn load_config_file(
    explicit_path: Option<&std::path::Path>,
) -> Result<ClientConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ClientConfigFile::default());
        };
        config_dir.join("taskdeck").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
