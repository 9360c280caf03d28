//! Instagram web API module.
//!
//! This module provides:
//! - Transport seam and the reqwest-backed implementation
//! - Response classification
//! - Endpoint paths and GraphQL document ids
//! - API client with transparent re-login and token refresh
//! - API response types

pub mod client;
pub mod endpoints;
pub mod response;
pub mod transport;
pub mod types;

pub use client::InstagramClient;
pub use response::{classify, ResponseClass};
pub use transport::{HttpRequest, HttpResponse, RequestBody, ReqwestTransport, Transport};
pub use types::*;
