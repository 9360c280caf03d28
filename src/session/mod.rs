//! Session and token lifecycle.
//!
//! This module provides:
//! - Cookie set and the persisted cookie file
//! - Session manager (login, restore, re-login, logout)
//! - Token derivation with a session-bound cache
//! - Request signing

pub mod cookies;
pub mod manager;
pub mod signer;
pub mod tokens;

pub use cookies::{Cookie, CookieSet, CookieStore};
pub use manager::{Credentials, Session, SessionManager};
pub use signer::{RequestSigner, RequestSpec};
pub use tokens::{TokenDeriver, TokenSet};
