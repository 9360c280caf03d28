//! Path and directory management.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::fs::naming::sanitize_path_component;

/// Folder for a user's highlight reel: `<dir>/highlights_<user>/<title>`.
pub fn get_highlight_folder(config: &Config, username: &str, title: &str) -> Result<PathBuf> {
    let user = sanitize_path_component(username)?;
    let title = sanitize_path_component(title)?;
    Ok(config
        .download_directory()
        .join(format!("highlights_{}", user))
        .join(title))
}

/// Folder for a user's profile picture: `<dir>/profile_<user>`.
pub fn get_profile_folder(config: &Config, username: &str) -> Result<PathBuf> {
    let user = sanitize_path_component(username)?;
    Ok(config.download_directory().join(format!("profile_{}", user)))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_test_config() -> Config {
        let mut config = Config::default();
        config.options.download_directory = Some(PathBuf::from("/downloads"));
        config
    }

    #[test]
    fn test_get_highlight_folder() {
        let config = make_test_config();
        let path = get_highlight_folder(&config, "alice", "Trips: 2024").unwrap();
        assert_eq!(path, PathBuf::from("/downloads/highlights_alice/Trips_ 2024"));
    }

    #[test]
    fn test_get_profile_folder() {
        let config = make_test_config();
        let path = get_profile_folder(&config, "alice").unwrap();
        assert_eq!(path, PathBuf::from("/downloads/profile_alice"));
        assert!(get_profile_folder(&config, "..").is_err());
    }

    #[test]
    fn test_ensure_dir_creates_nested() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
