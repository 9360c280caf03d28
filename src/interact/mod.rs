//! Comments and likes.

pub mod comment;
pub mod like;

pub use comment::{comment_on_latest_post, comment_on_post, CommentGuard};
pub use like::{like_post, unlike_post};
