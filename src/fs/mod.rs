//! Filesystem module.
//!
//! Provides:
//! - Path and directory management
//! - Filename sanitizing

pub mod naming;
pub mod paths;

pub use naming::{sanitize_filename, sanitize_path_component};
pub use paths::{ensure_dir, get_highlight_folder, get_profile_folder};
