//! Configuration management for Cyclecast

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Environment variable holding the OAuth2 client identifier
pub const CLIENT_ID_ENV: &str = "CLIENT_ID";

/// Environment variable holding the OAuth2 client secret
pub const CLIENT_SECRET_ENV: &str = "CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub content: ContentConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub posting: PostingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// JSON array of content items
    pub pool: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            pool: "content/tweets.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Posting-state document (shuffled order and posted indices)
    pub state: String,
    /// OAuth2 token pair written by cycle-setup and rotated every run
    pub credentials: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state: "content/state.json".to_string(),
            credentials: "content/tokens.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub authorize_url: String,
    pub redirect_uri: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.x.com/2".to_string(),
            authorize_url: "https://x.com/i/oauth2/authorize".to_string(),
            redirect_uri: "https://example.com/callback".to_string(),
        }
    }
}

/// What a run does when the selected item is a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadPolicy {
    /// Publish the thread as a reply chain
    #[default]
    Publish,
    /// Mark the thread as posted without publishing it and move on
    Skip,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostingConfig {
    pub thread_policy: ThreadPolicy,
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `CYCLECAST_CONFIG` and then
    /// the XDG config location are tried; when neither names an existing
    /// file the built-in defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        let config_path = resolve_config_path()?;
        if std::env::var_os("CYCLECAST_CONFIG").is_some() || config_path.exists() {
            return Self::load_from_path(&config_path);
        }

        tracing::debug!("No config file at {:?}, using defaults", config_path);
        Ok(Self::default())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    pub fn pool_path(&self) -> PathBuf {
        expand_path(&self.content.pool)
    }

    pub fn state_path(&self) -> PathBuf {
        expand_path(&self.storage.state)
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand_path(&self.storage.credentials)
    }
}

/// OAuth2 client identity, supplied through the environment
#[derive(Debug)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl ClientCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }

    /// Read `CLIENT_ID` and `CLIENT_SECRET`; an empty value counts as missing
    pub fn from_env() -> Result<Self> {
        let client_id = require_env(CLIENT_ID_ENV)?;
        let client_secret = require_env(CLIENT_SECRET_ENV)?;
        Ok(Self::new(client_id, client_secret))
    }
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::MissingEnv(name.to_string()).into()),
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CYCLECAST_CONFIG") {
        return Ok(expand_path(&path));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("cyclecast").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;

    #[test]
    fn test_defaults_match_content_layout() {
        let config = Config::default();
        assert_eq!(config.content.pool, "content/tweets.json");
        assert_eq!(config.storage.state, "content/state.json");
        assert_eq!(config.storage.credentials, "content/tokens.json");
        assert_eq!(config.api.base_url, "https://api.x.com/2");
        assert_eq!(config.posting.thread_policy, ThreadPolicy::Publish);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
[content]
pool = "/srv/bot/pool.json"

[posting]
thread_policy = "skip"
"#,
        )
        .unwrap();

        assert_eq!(config.content.pool, "/srv/bot/pool.json");
        assert_eq!(config.posting.thread_policy, ThreadPolicy::Skip);
        assert_eq!(config.storage.state, "content/state.json");
        assert_eq!(config.api.redirect_uri, "https://example.com/callback");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api.authorize_url, "https://x.com/i/oauth2/authorize");
    }

    #[test]
    fn test_unknown_thread_policy_rejected() {
        let result = Config::from_toml("[posting]\nthread_policy = \"drop\"\n");
        assert!(matches!(
            result,
            Err(crate::CyclecastError::Config(ConfigError::ParseError(_)))
        ));
    }

    #[test]
    fn test_missing_explicit_config_is_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(
            result,
            Err(crate::CyclecastError::Config(ConfigError::ReadError(_)))
        ));
    }

    #[test]
    fn test_expand_path_tilde() {
        let expanded = expand_path("~/cyclecast/state.json");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("cyclecast/state.json"));
    }

    #[test]
    #[serial]
    fn test_client_credentials_from_env() {
        std::env::set_var(CLIENT_ID_ENV, "abc");
        std::env::set_var(CLIENT_SECRET_ENV, " shh ");

        let creds = ClientCredentials::from_env().unwrap();
        assert_eq!(creds.client_id, "abc");
        assert_eq!(creds.client_secret.expose_secret(), "shh");

        std::env::remove_var(CLIENT_ID_ENV);
        std::env::remove_var(CLIENT_SECRET_ENV);
    }

    #[test]
    #[serial]
    fn test_client_credentials_missing_secret() {
        std::env::set_var(CLIENT_ID_ENV, "abc");
        std::env::remove_var(CLIENT_SECRET_ENV);

        match ClientCredentials::from_env() {
            Err(crate::CyclecastError::Config(ConfigError::MissingEnv(name))) => {
                assert_eq!(name, CLIENT_SECRET_ENV);
            }
            other => panic!("Expected MissingEnv, got {:?}", other),
        }

        std::env::remove_var(CLIENT_ID_ENV);
    }

    #[test]
    #[serial]
    fn test_client_credentials_empty_id_counts_as_missing() {
        std::env::set_var(CLIENT_ID_ENV, "   ");
        std::env::set_var(CLIENT_SECRET_ENV, "shh");

        assert!(ClientCredentials::from_env().is_err());

        std::env::remove_var(CLIENT_ID_ENV);
        std::env::remove_var(CLIENT_SECRET_ENV);
    }

    #[test]
    fn test_client_credentials_debug_redacts_secret() {
        let creds = ClientCredentials::new("abc", "super-secret-value");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret-value"));
    }
}
