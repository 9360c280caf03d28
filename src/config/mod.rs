//! Configuration module for the instagram-client.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Configuration validation
//! - Post, profile and story URL parsing

pub mod loader;
pub mod validation;

pub use loader::{AccountConfig, Config, NetworkConfig, OptionsConfig, TokenConfig, UploadConfig};
pub use validation::{
    parse_shortcode, parse_story_pk, parse_username, validate_config, validate_username,
};
