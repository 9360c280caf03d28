//! Error types for the instagram-client application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Session errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Challenge required: the platform wants manual verification ({checkpoint})")]
    ChallengeRequired { checkpoint: String },

    #[error("Re-authentication failed: {0}")]
    Reauthentication(String),

    #[error("Invalid session: {0}")]
    InvalidSession(String),

    #[error("Session expired: {0}")]
    SessionExpired(String),

    // Upload errors
    #[error("Upload rejected: {0}")]
    UploadRejected(String),

    #[error("Media configuration failed: {0}")]
    Configuration(String),

    #[error("Upload protocol error: {0}")]
    Upload(String),

    // API errors
    #[error("API error: {0}")]
    Api(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account @{0} is private")]
    PrivateAccount(String),

    #[error("Duplicate comment suppressed (same comment posted {seconds_ago}s ago)")]
    DuplicateComment { seconds_ago: u64 },

    // Download errors
    #[error("Download failed: {0}")]
    Download(String),

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    // Media errors
    #[error("Invalid media: {0}")]
    Media(String),

    // External tool errors
    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("FFmpeg not found. Please install ffmpeg and ensure it's in your PATH.")]
    FFmpegNotFound,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a bounded retry may re-issue the failed step.
    ///
    /// Network failures, timeouts, rate limiting and 5xx answers qualify.
    /// Everything else is either fatal or needs a fresh session.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transient(_) => true,
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Whether the failure is only recoverable under a new session.
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self,
            Error::SessionExpired(_) | Error::InvalidSession(_) | Error::Reauthentication(_)
        )
    }
}

/// Process exit codes for the CLI.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const AUTH_ERROR: i32 = 6;
    pub const UPLOAD_ERROR: i32 = 7;
}
