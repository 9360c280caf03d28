//! Configuration structures and loading logic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub account: AccountConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub options: OptionsConfig,

    #[serde(default)]
    pub tokens: TokenConfig,
}

/// Account credentials configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Instagram username. Also the key of the persisted cookie record.
    #[serde(default)]
    pub username: String,

    /// Password used for the initial login and for transparent re-login.
    /// Never written back when the configuration is saved.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Path of the persisted cookie file.
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Optional proxy URL (http, https or socks5).
    #[serde(default)]
    pub proxy: Option<String>,

    /// User-agent rotation pool. One entry is drawn per outgoing request.
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Web application id sent as `x-ig-app-id`.
    #[serde(default = "default_app_id")]
    pub app_id: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            user_agents: default_user_agents(),
            timeout_seconds: default_timeout(),
            app_id: default_app_id(),
        }
    }
}

/// Chunked upload configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Bytes per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Attempts per chunk, including the first send.
    #[serde(default = "default_attempts")]
    pub chunk_attempts: u32,

    /// Attempts for the configure step, including the first call.
    #[serde(default = "default_attempts")]
    pub finalize_attempts: u32,

    /// First backoff delay after a transient chunk failure.
    #[serde(default = "default_backoff_initial")]
    pub backoff_initial_ms: u64,

    /// Upper bound of the exponential backoff.
    #[serde(default = "default_backoff_max")]
    pub backoff_max_ms: u64,

    /// Delay between configure attempts while the platform processes media.
    #[serde(default = "default_finalize_interval")]
    pub finalize_interval_ms: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_attempts: default_attempts(),
            finalize_attempts: default_attempts(),
            backoff_initial_ms: default_backoff_initial(),
            backoff_max_ms: default_backoff_max(),
            finalize_interval_ms: default_finalize_interval(),
        }
    }
}

/// Download and pacing options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Base directory for downloads.
    #[serde(default)]
    pub download_directory: Option<PathBuf>,

    /// Lower bound of the random delay before paced requests.
    #[serde(default = "default_delay_min")]
    pub request_delay_min_ms: u64,

    /// Upper bound of the random delay before paced requests.
    #[serde(default = "default_delay_max")]
    pub request_delay_max_ms: u64,

    /// Maximum number of posts fetched for a profile download.
    #[serde(default = "default_max_posts")]
    pub max_profile_posts: usize,

    /// Whether profile downloads include current stories.
    #[serde(default = "default_true")]
    pub include_stories: bool,

    /// Whether profile downloads include highlights.
    #[serde(default = "default_true")]
    pub include_highlights: bool,

    /// Whether to show progress bars.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            download_directory: None,
            request_delay_min_ms: default_delay_min(),
            request_delay_max_ms: default_delay_max(),
            max_profile_posts: default_max_posts(),
            include_stories: true,
            include_highlights: true,
            show_progress: true,
        }
    }
}

/// Token cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// How long a derived token set is reused before it is fetched again.
    #[serde(default = "default_token_ttl")]
    pub ttl_minutes: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_token_ttl(),
        }
    }
}

pub(crate) fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36",
    ]
    .iter()
    .map(|ua| ua.to_string())
    .collect()
}

fn default_timeout() -> u64 {
    15
}

fn default_app_id() -> String {
    "936619743392459".to_string()
}

fn default_chunk_size() -> u64 {
    4 * 1024 * 1024
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_initial() -> u64 {
    1000
}

fn default_backoff_max() -> u64 {
    8000
}

fn default_finalize_interval() -> u64 {
    5000
}

fn default_delay_min() -> u64 {
    1500
}

fn default_delay_max() -> u64 {
    3500
}

fn default_max_posts() -> usize {
    50
}

fn default_token_ttl() -> i64 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective download directory.
    pub fn download_directory(&self) -> PathBuf {
        self.options
            .download_directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("downloads"))
    }

    /// Get the effective cookie file path.
    ///
    /// Falls back to `cookies.json` in the platform data directory, or the
    /// working directory when no home directory can be determined.
    pub fn cookie_file(&self) -> PathBuf {
        if let Some(path) = &self.account.cookie_file {
            return path.clone();
        }

        directories::ProjectDirs::from("com", "instagram-client", "instagram-client")
            .map(|dirs| dirs.data_dir().join("cookies.json"))
            .unwrap_or_else(|| PathBuf::from("cookies.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.upload.chunk_attempts, 3);
        assert_eq!(config.upload.finalize_attempts, 3);
        assert_eq!(config.network.user_agents.len(), 4);
        assert_eq!(config.network.timeout_seconds, 15);
        assert_eq!(config.tokens.ttl_minutes, 30);
        assert!(config.options.include_stories);
    }

    #[test]
    fn test_password_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.account.username = "someone".into();
        config.account.password = Some("hunter2".into());
        config.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("hunter2"));

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.account.username, "someone");
        assert!(loaded.account.password.is_none());
    }

    #[test]
    fn test_explicit_cookie_file_wins() {
        let mut config = Config::default();
        config.account.cookie_file = Some(PathBuf::from("/tmp/x.json"));
        assert_eq!(config.cookie_file(), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
