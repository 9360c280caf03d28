//! Comment posting with a local duplicate guard.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::api::endpoints::{comment_url, post_url};
use crate::api::types::CommentResponse;
use crate::api::InstagramClient;
use crate::config::parse_shortcode;
use crate::error::{Error, Result};
use crate::session::{RequestSpec, Session};

/// How long an identical comment on the same media is suppressed.
const DUPLICATE_WINDOW: Duration = Duration::from_secs(30);

/// Characters of the comment text that take part in the guard key.
const KEY_PREFIX_CHARS: usize = 50;

/// Remembers recent comment attempts per media id and text prefix.
#[derive(Debug, Default)]
pub struct CommentGuard {
    recent: HashMap<String, Instant>,
}

impl CommentGuard {
    fn key(media_id: &str, text: &str) -> String {
        let prefix: String = text.chars().take(KEY_PREFIX_CHARS).collect();
        format!("{}:{}", media_id, prefix)
    }

    /// Record an attempt, or refuse it if the same comment was attempted
    /// within the window. Returns the key to release on failure.
    pub fn check_and_mark(&mut self, media_id: &str, text: &str) -> Result<String> {
        self.check_and_mark_at(media_id, text, Instant::now())
    }

    fn check_and_mark_at(&mut self, media_id: &str, text: &str, now: Instant) -> Result<String> {
        self.recent
            .retain(|_, at| now.saturating_duration_since(*at) < DUPLICATE_WINDOW);

        let key = Self::key(media_id, text);
        if let Some(at) = self.recent.get(&key) {
            return Err(Error::DuplicateComment {
                seconds_ago: now.saturating_duration_since(*at).as_secs(),
            });
        }

        self.recent.insert(key.clone(), now);
        Ok(key)
    }

    /// Forget a failed attempt so it can be retried right away.
    pub fn release(&mut self, key: &str) {
        self.recent.remove(key);
    }
}

/// Comment on the post at `url`. Returns the comment id.
pub async fn comment_on_post(
    client: &mut InstagramClient,
    session: &mut Session,
    url: &str,
    text: &str,
) -> Result<String> {
    let shortcode = parse_shortcode(url)?;
    comment_on_shortcode(client, session, &shortcode, text).await
}

/// Comment on the newest post of `username`.
pub async fn comment_on_latest_post(
    client: &mut InstagramClient,
    session: &mut Session,
    username: &str,
    text: &str,
) -> Result<String> {
    let posts = client.user_posts(session, username, 1).await?;
    let shortcode = posts
        .first()
        .and_then(|post| post.shortcode())
        .map(str::to_string)
        .ok_or_else(|| Error::NotFound(format!("posts of @{}", username)))?;

    tracing::info!("Latest post of @{} is {}", username, shortcode);
    comment_on_shortcode(client, session, &shortcode, text).await
}

async fn comment_on_shortcode(
    client: &mut InstagramClient,
    session: &mut Session,
    shortcode: &str,
    text: &str,
) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::ConfigValidation {
            field: "comment".to_string(),
            message: "comment text is empty".to_string(),
        });
    }

    let media_id = client.media_id(session, shortcode).await?;
    let key = client.comment_guard().check_and_mark(&media_id, text)?;

    let result = post_comment(client, session, &media_id, shortcode, text).await;
    if result.is_err() {
        client.comment_guard().release(&key);
    }
    result
}

async fn post_comment(
    client: &mut InstagramClient,
    session: &mut Session,
    media_id: &str,
    shortcode: &str,
    text: &str,
) -> Result<String> {
    client.pace().await;

    let spec = RequestSpec::post_form(comment_url(media_id), [("comment_text", text)])
        .referer(post_url(shortcode))
        .not_replay_safe();
    let response: CommentResponse = client.execute_json(session, &spec).await?;

    if response.status.as_deref() != Some("ok") {
        return Err(Error::Rejected(format!(
            "comment on {} was not accepted",
            shortcode
        )));
    }

    tracing::info!("Comment added to {}", shortcode);
    Ok(response.id.unwrap_or_default())
}
