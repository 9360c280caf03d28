//! Command-line argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// Instagram web client CLI.
#[derive(Parser, Debug)]
#[command(
    name = "instagram-client",
    version,
    about = "Download, publish and interact with Instagram media",
    long_about = "A CLI tool that keeps an authenticated Instagram web session.\n\n\
                  Downloads posts, reels, stories, highlights and whole profiles, \
                  publishes photos and reels, and posts comments and likes."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Account to act as.
    #[arg(short, long, global = true, env = "IG_USERNAME")]
    pub username: Option<String>,

    /// Account password, used for the first login and for re-login.
    #[arg(short, long, global = true, env = "IG_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Where session cookies are persisted.
    #[arg(long = "cookie-file", global = true, env = "IG_COOKIE_FILE")]
    pub cookie_file: Option<PathBuf>,

    /// HTTP(S) or SOCKS5 proxy URL.
    #[arg(long, global = true, env = "IG_PROXY")]
    pub proxy: Option<String>,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory", global = true)]
    pub download_directory: Option<PathBuf>,

    /// Path to configuration file.
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    /// Hide progress bars.
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Operations the client can perform.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and persist the session cookies.
    Login,
    /// Forget the persisted session of the account.
    Logout,
    /// Download every image and video of a post.
    Post {
        /// Post URL, e.g. https://www.instagram.com/p/<shortcode>/
        url: String,
    },
    /// Download a reel.
    Reel {
        /// Reel URL, e.g. https://www.instagram.com/reel/<shortcode>/
        url: String,
    },
    /// Download one story, or all current stories of a user.
    Story {
        /// Story URL, e.g. https://www.instagram.com/stories/<user>/[<pk>/]
        url: String,
    },
    /// Download all highlight reels of a user.
    Highlights {
        /// Username or profile URL.
        user: String,
    },
    /// Download profile picture, posts, stories and highlights of a user.
    Profile {
        /// Username or profile URL.
        user: String,
        /// Maximum number of posts to download.
        #[arg(long)]
        max_posts: Option<usize>,
        /// Skip current stories.
        #[arg(long)]
        no_stories: bool,
        /// Skip highlights.
        #[arg(long)]
        no_highlights: bool,
    },
    /// Publish a photo to the feed.
    UploadPhoto {
        /// JPEG or PNG file.
        path: PathBuf,
        #[arg(long, default_value = "")]
        caption: String,
    },
    /// Publish a video as a reel.
    UploadReel {
        /// Video file.
        path: PathBuf,
        /// Cover image. Extracted from the first frame when omitted.
        #[arg(long)]
        thumbnail: Option<PathBuf>,
        #[arg(long, default_value = "")]
        caption: String,
    },
    /// Comment on a post.
    Comment {
        /// Post URL.
        url: String,
        text: String,
    },
    /// Comment on the newest post of a user.
    CommentLatest {
        /// Username or profile URL.
        user: String,
        text: String,
    },
    /// Like a post.
    Like {
        /// Post URL.
        url: String,
    },
    /// Remove a like from a post.
    Unlike {
        /// Post URL.
        url: String,
    },
}

impl Command {
    /// Short name for summaries and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Login => "login",
            Command::Logout => "logout",
            Command::Post { .. } => "post",
            Command::Reel { .. } => "reel",
            Command::Story { .. } => "story",
            Command::Highlights { .. } => "highlights",
            Command::Profile { .. } => "profile",
            Command::UploadPhoto { .. } => "upload-photo",
            Command::UploadReel { .. } => "upload-reel",
            Command::Comment { .. } => "comment",
            Command::CommentLatest { .. } => "comment-latest",
            Command::Like { .. } => "like",
            Command::Unlike { .. } => "unlike",
        }
    }
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(username) = &self.username {
            config.account.username = username.trim_start_matches('@').to_string();
        }

        if let Some(password) = &self.password {
            config.account.password = Some(password.clone());
        }

        if let Some(cookie_file) = &self.cookie_file {
            config.account.cookie_file = Some(cookie_file.clone());
        }

        if let Some(proxy) = &self.proxy {
            config.network.proxy = Some(proxy.clone());
        }

        if let Some(dir) = &self.download_directory {
            config.options.download_directory = Some(dir.clone());
        }

        if self.quiet {
            config.options.show_progress = false;
        }

        if let Command::Profile {
            max_posts,
            no_stories,
            no_highlights,
            ..
        } = &self.command
        {
            if let Some(max) = max_posts {
                config.options.max_profile_posts = *max;
            }
            if *no_stories {
                config.options.include_stories = false;
            }
            if *no_highlights {
                config.options.include_highlights = false;
            }
        }
    }
}
