//! Command-line interface.

pub mod args;

pub use args::{Args, Command};

use crate::config::{parse_username, validate_username};
use crate::error::Result;

/// Accept either a bare username (with or without `@`) or a profile URL.
pub fn resolve_username(input: &str) -> Result<String> {
    let input = input.trim();
    if input.starts_with("http://") || input.starts_with("https://") {
        return parse_username(input);
    }

    let name = input.trim_start_matches('@');
    validate_username(name)?;
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_username() {
        assert_eq!(resolve_username("@alice").unwrap(), "alice");
        assert_eq!(
            resolve_username("https://www.instagram.com/alice/").unwrap(),
            "alice"
        );
        assert!(resolve_username("not a user").is_err());
    }
}
