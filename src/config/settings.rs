use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::gateway::http::{DEFAULT_BASE_URL, DEFAULT_COOKIE_NAME};
use crate::gateway::AssistantModel;
use crate::util::paths::config_path;

/// Example configuration file contents (bundled with the binary)
pub const EXAMPLE_CONFIG: &str = include_str!("config.toml.example");

const DEFAULT_LOG_LEVEL: &str = "info";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the collection service
    pub base_url: String,
    /// Cookie the session token is sent in
    pub cookie_name: String,
    /// Session token from an external login
    pub session_token: Option<String>,
    /// Assistant model attached to chat requests (None = server default)
    pub model: Option<AssistantModel>,
    /// Log filter directive for the log file
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            session_token: None,
            model: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlServerConfig {
    pub base_url: Option<String>,
    pub cookie_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlSessionConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlChatConfig {
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlLogConfig {
    pub level: Option<String>,
}

/// TOML representation of the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub server: Option<TomlServerConfig>,
    pub session: Option<TomlSessionConfig>,
    pub chat: Option<TomlChatConfig>,
    pub log: Option<TomlLogConfig>,
}

impl Config {
    /// Load configuration from the default config file, merging with defaults.
    /// Writes the example file on first run.
    ///
    /// Problems with the file are returned as warnings for the caller to
    /// report once logging is up.
    pub fn load() -> (Self, Vec<String>) {
        let config_file = config_path();

        if !config_file.exists() {
            Self::create_default_config(&config_file);
        }

        Self::load_from(&config_file)
    }

    /// Load configuration from `path`. A missing file yields the defaults;
    /// an unreadable or unparseable one yields the defaults and a warning.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        let mut config = Config::default();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (config, Vec::new()),
            Err(e) => {
                let warning = format!("Ignoring unreadable config file {}: {}", path.display(), e);
                return (config, vec![warning]);
            }
        };

        let warnings = match toml::from_str::<TomlConfig>(&contents) {
            Ok(toml_config) => config.merge(toml_config),
            Err(e) => vec![format!(
                "Ignoring invalid config file {}: {}",
                path.display(),
                e.message()
            )],
        };

        (config, warnings)
    }

    fn merge(&mut self, toml_config: TomlConfig) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(server) = toml_config.server {
            if let Some(base_url) = server.base_url.filter(|s| !s.trim().is_empty()) {
                self.base_url = base_url;
            }
            if let Some(cookie_name) = server.cookie_name.filter(|s| !s.trim().is_empty()) {
                self.cookie_name = cookie_name;
            }
        }

        if let Some(session) = toml_config.session {
            if let Some(token) = session.token.filter(|s| !s.trim().is_empty()) {
                self.session_token = Some(token);
            }
        }

        if let Some(chat) = toml_config.chat {
            if let Some(name) = chat.model {
                match AssistantModel::parse(&name) {
                    Some(model) => self.model = Some(model),
                    None => warnings.push(format!("Ignoring unknown model '{}' in config", name)),
                }
            }
        }

        if let Some(level) = toml_config.log.and_then(|log| log.level) {
            self.log_level = level;
        }

        warnings
    }

    /// Create the default config file from the bundled example
    fn create_default_config(path: &Path) {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create config directory: {}", e);
                    return;
                }
            }
        }

        if let Err(e) = fs::write(path, EXAMPLE_CONFIG) {
            eprintln!("Failed to write default config: {}", e);
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    pub fn with_model(mut self, model: AssistantModel) -> Self {
        self.model = Some(model);
        self
    }
}
