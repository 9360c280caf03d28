//! Configuration validation and URL parsing.

use std::sync::LazyLock;

use crate::config::loader::Config;
use crate::error::{Error, Result};
use regex::Regex;

/// Minimum length for a user agent.
const MIN_USER_AGENT_LENGTH: usize = 40;

/// Maximum username length.
const MAX_USERNAME_LENGTH: usize = 30;

static USERNAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._]{1,30}$").expect("valid username regex"));

static SHORTCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://(?:www\.)?instagram\.com/(?:p|reel|reels|tv)/([A-Za-z0-9_-]+)")
        .expect("valid shortcode regex")
});

/// Path segments that are never usernames.
const RESERVED_SEGMENTS: &[&str] = &["p", "reel", "reels", "tv", "explore", "accounts", "stories"];

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    if !config.account.username.is_empty() {
        validate_username(&config.account.username)?;
    }
    validate_user_agents(&config.network.user_agents)?;
    if let Some(proxy) = &config.network.proxy {
        validate_proxy(proxy)?;
    }

    if config.upload.chunk_size == 0 {
        return Err(Error::ConfigValidation {
            field: "upload.chunk_size".to_string(),
            message: "Chunk size must be greater than zero".to_string(),
        });
    }

    if config.upload.chunk_attempts == 0 || config.upload.finalize_attempts == 0 {
        return Err(Error::ConfigValidation {
            field: "upload".to_string(),
            message: "Attempt bounds must be at least 1".to_string(),
        });
    }

    if config.options.request_delay_min_ms > config.options.request_delay_max_ms {
        return Err(Error::ConfigValidation {
            field: "options.request_delay_min_ms".to_string(),
            message: "Minimum delay exceeds maximum delay".to_string(),
        });
    }

    Ok(())
}

/// Validate an Instagram username.
pub fn validate_username(username: &str) -> Result<()> {
    let clean = username.trim_start_matches('@');

    if clean.len() > MAX_USERNAME_LENGTH {
        return Err(Error::ConfigValidation {
            field: "username".to_string(),
            message: format!(
                "Username '{}' is too long (maximum {} characters)",
                username, MAX_USERNAME_LENGTH
            ),
        });
    }

    if !USERNAME_PATTERN.is_match(clean) {
        return Err(Error::ConfigValidation {
            field: "username".to_string(),
            message: format!(
                "Username '{}' contains invalid characters. Only letters, digits, '.' and '_' allowed.",
                username
            ),
        });
    }

    Ok(())
}

/// Validate the user-agent rotation pool.
pub fn validate_user_agents(pool: &[String]) -> Result<()> {
    if pool.is_empty() {
        return Err(Error::MissingConfig(
            "network.user_agents (at least one user agent required)".to_string(),
        ));
    }

    for user_agent in pool {
        if user_agent.len() < MIN_USER_AGENT_LENGTH {
            return Err(Error::ConfigValidation {
                field: "network.user_agents".to_string(),
                message: format!(
                    "User agent must be at least {} characters (got {})",
                    MIN_USER_AGENT_LENGTH,
                    user_agent.len()
                ),
            });
        }
    }

    Ok(())
}

/// Validate a proxy URL.
pub fn validate_proxy(proxy: &str) -> Result<()> {
    let parsed = url::Url::parse(proxy)?;
    match parsed.scheme() {
        "http" | "https" | "socks5" | "socks5h" => Ok(()),
        other => Err(Error::ConfigValidation {
            field: "network.proxy".to_string(),
            message: format!("Unsupported proxy scheme: {}", other),
        }),
    }
}

/// Extract the shortcode from a post or reel URL.
pub fn parse_shortcode(input: &str) -> Result<String> {
    let input = input.trim().trim_end_matches(',');

    SHORTCODE_PATTERN
        .captures(input)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::InvalidUrl(format!("Unsupported post URL: {}", input)))
}

/// Extract the username from a profile or story URL.
pub fn parse_username(input: &str) -> Result<String> {
    let segments = instagram_path_segments(input)?;
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    let candidate = match segments.as_slice() {
        ["stories", user, ..] => *user,
        [first, ..] if !RESERVED_SEGMENTS.contains(first) => *first,
        _ => {
            return Err(Error::InvalidUrl(format!(
                "Cannot extract username from URL: {}",
                input
            )))
        }
    };

    validate_username(candidate)?;
    Ok(candidate.to_string())
}

/// Extract the story primary key from a story URL, if it names one.
pub fn parse_story_pk(input: &str) -> Result<Option<String>> {
    let segments = instagram_path_segments(input)?;
    let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

    match segments.as_slice() {
        ["stories", _, pk] if pk.chars().all(|c| c.is_ascii_digit()) => Ok(Some(pk.to_string())),
        _ => Ok(None),
    }
}

fn instagram_path_segments(input: &str) -> Result<Vec<String>> {
    let parsed = url::Url::parse(input.trim())?;
    match parsed.host_str() {
        Some("www.instagram.com") | Some("instagram.com") => {}
        _ => {
            return Err(Error::InvalidUrl(format!(
                "Not an Instagram URL: {}",
                input
            )))
        }
    }

    Ok(parsed
        .path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}
