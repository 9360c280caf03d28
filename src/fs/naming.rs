//! Filename sanitizing.

use crate::error::{Error, Result};

/// Characters Windows or common shells choke on.
const RESERVED: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// Check a media filename built from captions and shortcodes.
///
/// Reserved characters become `_`. Traversal, separators and NUL are errors,
/// since a generated name should never carry them.
pub fn sanitize_filename(name: &str) -> Result<String> {
    reject_unsafe(name)?;
    if name.contains(['/', '\\']) {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }
    non_empty(replace_reserved(name, false), "Filename")
}

/// Clean a folder name taken from platform data (usernames, highlight
/// titles). Separators are replaced instead of refused.
pub fn sanitize_path_component(name: &str) -> Result<String> {
    reject_unsafe(name)?;
    non_empty(replace_reserved(name, true), "Path component")
}

fn reject_unsafe(name: &str) -> Result<()> {
    // a bare ".." or one next to a separator; "Wow..." is fine
    let traversal = name.trim() == ".." || name.contains("../") || name.contains("..\\");
    if traversal {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }
    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed: '{}'",
            name
        )));
    }
    Ok(())
}

fn replace_reserved(name: &str, separators: bool) -> String {
    name.chars()
        .map(|c| {
            let separator = separators && (c == '/' || c == '\\');
            if separator || RESERVED.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn non_empty(name: String, what: &str) -> Result<String> {
    if name.trim().is_empty() {
        return Err(Error::InvalidFilename(format!(
            "{} cannot be empty or whitespace-only",
            what
        )));
    }
    Ok(name)
}
