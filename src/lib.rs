//! instagram-client - a client for Instagram's private web API
//!
//! This library keeps an authenticated web session and builds download,
//! upload and interaction operations on top of it.
//!
//! # Features
//!
//! - Login with persisted cookies and transparent re-login on expiry
//! - CSRF and rollout token derivation bound to the live session
//! - Post, reel, story, highlight and full profile downloads
//! - Chunked, resumable photo and reel uploads with bounded finalize retries
//! - Comments with a local duplicate guard, likes and unlikes
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use instagram_client::{download::download_post, Config, InstagramClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let mut client = InstagramClient::new(config)?;
//!     let mut session = client.connect().await?;
//!
//!     let report = download_post(&mut client, &mut session, "https://www.instagram.com/p/ABC/").await?;
//!     println!("{} file(s) saved", report.total_downloaded());
//!     client.persist(&session)?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod fs;
pub mod interact;
pub mod media;
pub mod output;
pub mod session;
pub mod upload;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use api::InstagramClient;
pub use config::Config;
pub use download::{
    download_highlights, download_post, download_profile, download_reel, download_story,
    DownloadReport, ProfileOptions,
};
pub use error::{Error, Result};
pub use interact::{comment_on_latest_post, comment_on_post, like_post, unlike_post};
pub use media::{MediaItem, MediaType};
pub use session::{Session, SessionManager};
pub use upload::{upload_photo, upload_reel, UploadJob, UploadStatus};
