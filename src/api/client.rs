//! Instagram web API client.
//!
//! Every business request goes through [`InstagramClient::execute`]:
//! validate the session, attach tokens, send, classify, and recover at most
//! once from a lost session and at most once from a stale token.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::api::endpoints::{
    graphql_query_url, media_info_url, post_url, profile_url, reels_media_url,
    web_profile_info_url, HIGHLIGHTS_DOC_IDS, HIGHLIGHT_ITEMS_DOC_ID, POST_DOC_IDS,
    USER_POSTS_DOC_IDS,
};
use crate::api::response::{classify, ResponseClass};
use crate::api::transport::{build_media_client, HttpResponse, ReqwestTransport, Transport};
use crate::api::types::*;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::interact::CommentGuard;
use crate::session::{
    CookieStore, Credentials, RequestSigner, RequestSpec, Session, SessionManager, TokenDeriver,
};
use crate::upload::ChunkedUpload;

/// Page size cap of the timeline query.
const MAX_PAGE_SIZE: usize = 50;

/// Instagram client bound to one account.
pub struct InstagramClient {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    sessions: SessionManager,
    tokens: TokenDeriver,
    config: Config,
    media_client: Client,
    comment_guard: CommentGuard,
}

impl InstagramClient {
    /// Create a client over the production transport.
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config.network)?);
        Self::with_transport(config, transport)
    }

    /// Create a client over any transport. Restores a persisted session for
    /// the configured account when one is on disk.
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let signer = RequestSigner::new(
            config.network.app_id.clone(),
            config.network.user_agents.clone(),
        );
        let store = CookieStore::new(config.cookie_file());
        let mut sessions = SessionManager::new(
            transport.clone(),
            signer.clone(),
            store,
            &config.account.username,
        )?;

        if let Some(password) = &config.account.password {
            if !config.account.username.is_empty() {
                sessions.set_credentials(Credentials::new(
                    config.account.username.clone(),
                    password.clone(),
                ));
            }
        }

        let tokens = TokenDeriver::new(transport.clone(), signer.clone(), config.tokens.ttl_minutes);
        let media_client = build_media_client(&config.network)?;

        Ok(Self {
            transport,
            signer,
            sessions,
            tokens,
            config,
            media_client,
            comment_guard: CommentGuard::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Unsigned client for CDN media downloads.
    pub fn media_client(&self) -> &Client {
        &self.media_client
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub(crate) fn comment_guard(&mut self) -> &mut CommentGuard {
        &mut self.comment_guard
    }

    /// The restored session, or a fresh login with configured credentials.
    pub async fn connect(&mut self) -> Result<Session> {
        self.sessions.open().await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        self.tokens.clear();
        self.sessions.login(username, password).await
    }

    pub fn logout(&mut self, session: &mut Session) -> Result<()> {
        self.tokens.clear();
        self.sessions.logout(session)
    }

    /// Remove the persisted record of the configured account even when no
    /// live session could be restored from it.
    pub fn forget_account(&mut self) -> Result<bool> {
        self.tokens.clear();
        self.sessions.forget()
    }

    /// Send a request on behalf of `session`.
    ///
    /// `session` is replaced when a re-login happens, so callers keep using
    /// the same binding afterwards.
    pub async fn execute(&mut self, session: &mut Session, spec: &RequestSpec) -> Result<HttpResponse> {
        *session = self.sessions.ensure_valid(session).await?;

        let mut relogged = false;
        let mut token_refreshed = false;
        let mut force_tokens = false;

        loop {
            let derived = if force_tokens {
                force_tokens = false;
                self.tokens.on_token_rejected(session).await
            } else {
                self.tokens.refresh(session).await
            };

            let tokens = match derived {
                Ok(tokens) => tokens,
                Err(Error::SessionExpired(reason)) => {
                    self.reauthenticate(session, spec, &mut relogged, &reason)
                        .await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let request = self.signer.prepare(session, &tokens, spec)?;
            tracing::debug!("{} {}", request.method, request.url);

            let response = self.transport.execute(request).await?;
            tracing::debug!("Response status: {}", response.status);
            if session.absorb(response.cookies.clone()) {
                self.sessions.update(session);
            }

            match classify(response) {
                ResponseClass::Ok(response) => return Ok(response),
                ResponseClass::NeedsReauth => {
                    self.reauthenticate(session, spec, &mut relogged, "login required")
                        .await?;
                }
                ResponseClass::NeedsTokenRefresh => {
                    if token_refreshed {
                        return Err(Error::SessionExpired(
                            "token rejected again after a fresh derivation".to_string(),
                        ));
                    }
                    if !spec.replay_safe {
                        self.tokens.clear();
                        return Err(Error::SessionExpired(format!(
                            "stale token; {} {} was not replayed",
                            spec.method, spec.url
                        )));
                    }
                    token_refreshed = true;
                    force_tokens = true;
                }
                ResponseClass::Rejected(reason) => return Err(Error::Rejected(reason)),
                ResponseClass::Transient(reason) => return Err(Error::Transient(reason)),
                ResponseClass::Fatal(reason) => return Err(Error::Api(reason)),
            }
        }
    }

    async fn reauthenticate(
        &mut self,
        session: &mut Session,
        spec: &RequestSpec,
        relogged: &mut bool,
        reason: &str,
    ) -> Result<()> {
        self.sessions.invalidate(session);
        self.tokens.clear();

        if *relogged {
            return Err(Error::SessionExpired(format!(
                "{} again right after logging in",
                reason
            )));
        }
        if !spec.replay_safe {
            return Err(Error::SessionExpired(format!(
                "{}; {} {} was not replayed",
                reason, spec.method, spec.url
            )));
        }

        *relogged = true;
        *session = self.sessions.ensure_valid(session).await?;
        Ok(())
    }

    /// Execute and decode a JSON answer.
    pub async fn execute_json<T: DeserializeOwned>(
        &mut self,
        session: &mut Session,
        spec: &RequestSpec,
    ) -> Result<T> {
        self.execute(session, spec).await?.json()
    }

    /// Start an upload under `session` with a token set fixed for the job.
    pub async fn upload_session<'s>(&mut self, session: &'s mut Session) -> Result<ChunkedUpload<'s>> {
        *session = self.sessions.ensure_valid(session).await?;
        let tokens = match self.tokens.refresh(session).await {
            Ok(tokens) => tokens,
            Err(e) => {
                if e.is_session_loss() {
                    self.sessions.invalidate(session);
                }
                return Err(e);
            }
        };

        Ok(ChunkedUpload::new(
            self.transport.clone(),
            self.signer.clone(),
            session,
            tokens,
            &self.config.upload,
        ))
    }

    /// Fold the outcome of work done outside `execute` back into the
    /// manager: keep rotated cookies, drop a session the platform refused.
    pub fn settle<T>(&mut self, session: &mut Session, result: &Result<T>) {
        self.sessions.update(session);
        if let Err(e) = result {
            if e.is_session_loss() {
                self.sessions.invalidate(session);
                self.tokens.clear();
            }
        }
    }

    /// Persist the session's current cookies.
    pub fn persist(&mut self, session: &Session) -> Result<()> {
        self.sessions.update(session);
        self.sessions.persist()
    }

    /// Sleep for a random interval within the configured pacing range.
    pub async fn pace(&self) {
        let min = self.config.options.request_delay_min_ms;
        let max = self.config.options.request_delay_max_ms.max(min);
        if max == 0 {
            return;
        }
        let delay = rand::thread_rng().gen_range(min..=max);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    /// Public profile data by username.
    pub async fn user_info(&mut self, session: &mut Session, username: &str) -> Result<UserInfo> {
        let spec = RequestSpec::get(web_profile_info_url(username)).referer(profile_url(username));
        let response: WebProfileInfoResponse = self.execute_json(session, &spec).await?;

        response
            .data
            .user
            .map(UserInfo::from)
            .ok_or_else(|| Error::NotFound(format!("user @{}", username)))
    }

    /// Post or reel by shortcode, trying each known document id in turn.
    pub async fn shortcode_media(&mut self, session: &mut Session, shortcode: &str) -> Result<ShortcodeMedia> {
        let variables = json!({ "shortcode": shortcode });

        for (index, doc_id) in POST_DOC_IDS.iter().enumerate() {
            let spec = RequestSpec::get(graphql_query_url(doc_id, &variables))
                .referer(post_url(shortcode));

            match self.execute_json::<ShortcodeMediaResponse>(session, &spec).await {
                Ok(response) => {
                    if let Some(media) = response.data.and_then(|d| d.xdt_shortcode_media) {
                        if index > 0 {
                            tracing::info!("Post lookup succeeded with fallback doc id {}", doc_id);
                        }
                        return Ok(media);
                    }
                    tracing::debug!("Doc id {} returned no media for {}", doc_id, shortcode);
                }
                Err(e) if e.is_session_loss() || matches!(e, Error::ChallengeRequired { .. }) => {
                    return Err(e)
                }
                Err(e) => tracing::debug!("Doc id {} failed for {}: {}", doc_id, shortcode, e),
            }
        }

        Err(Error::NotFound(format!("post {}", shortcode)))
    }

    /// Numeric media id of a post.
    pub async fn media_id(&mut self, session: &mut Session, shortcode: &str) -> Result<String> {
        Ok(self.shortcode_media(session, shortcode).await?.id)
    }

    /// Up to `max` timeline entries of a user, newest first.
    pub async fn user_posts(
        &mut self,
        session: &mut Session,
        username: &str,
        max: usize,
    ) -> Result<Vec<TimelineNode>> {
        let mut posts = Vec::new();
        let mut cursor: Option<String> = None;

        while posts.len() < max {
            let page_size = (max - posts.len()).min(MAX_PAGE_SIZE);
            let variables = json!({
                "after": cursor,
                "before": null,
                "data": {
                    "count": page_size,
                    "include_reel_media_seen_timestamp": true,
                    "include_relationship_info": true,
                    "latest_besties_reel_media": true,
                    "latest_reel_media": true,
                },
                "first": page_size,
                "last": null,
                "username": username,
                "__relay_internal__pv__PolarisIsLoggedInrelayprovider": true,
                "__relay_internal__pv__PolarisShareSheetV3relayprovider": true,
            });

            let Some(connection) = self.timeline_page(session, username, &variables).await? else {
                tracing::warn!("No timeline page for @{}; stopping at {} posts", username, posts.len());
                break;
            };

            let before = posts.len();
            posts.extend(
                connection
                    .edges
                    .into_iter()
                    .map(|edge| edge.node)
                    .filter(|node| node.shortcode().is_some())
                    .take(max - before),
            );
            tracing::debug!("Fetched {} posts for @{}", posts.len(), username);

            if posts.len() == before || !connection.page_info.has_next_page {
                break;
            }
            match connection.page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
            self.pace().await;
        }

        Ok(posts)
    }

    async fn timeline_page(
        &mut self,
        session: &mut Session,
        username: &str,
        variables: &serde_json::Value,
    ) -> Result<Option<TimelineConnection>> {
        for doc_id in USER_POSTS_DOC_IDS {
            let spec = RequestSpec::get(graphql_query_url(doc_id, variables))
                .referer(profile_url(username));

            match self.execute_json::<TimelineResponse>(session, &spec).await {
                Ok(response) => {
                    if let Some(connection) = response.data.and_then(|d| d.connection) {
                        return Ok(Some(connection));
                    }
                }
                Err(e) if e.is_session_loss() || matches!(e, Error::ChallengeRequired { .. }) => {
                    return Err(e)
                }
                Err(e) => tracing::debug!("Timeline doc id {} failed: {}", doc_id, e),
            }
        }
        Ok(None)
    }

    /// Current stories of a user.
    pub async fn stories(&mut self, session: &mut Session, user_id: &str) -> Result<Vec<StoryItem>> {
        let spec = RequestSpec::get(reels_media_url(user_id));
        let mut response: ReelsMediaResponse = self.execute_json(session, &spec).await?;

        Ok(response
            .reels
            .remove(user_id)
            .map(|reel| reel.items)
            .unwrap_or_default())
    }

    /// A single story item by its numeric pk.
    pub async fn story(&mut self, session: &mut Session, pk: &str) -> Result<StoryItem> {
        let spec = RequestSpec::get(media_info_url(pk));
        let response: MediaInfoResponse = self.execute_json(session, &spec).await?;

        response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("story {}", pk)))
    }

    /// Highlight reels of a user with their items.
    pub async fn highlights(
        &mut self,
        session: &mut Session,
        username: &str,
        user_id: &str,
    ) -> Result<Vec<Highlight>> {
        let variables = json!({
            "user_id": user_id,
            "include_chaining": true,
            "include_reel": true,
            "include_suggested_users": false,
            "include_logged_out_extras": false,
            "include_highlight_reels": true,
            "include_live_status": true,
        });

        let mut nodes = None;
        for doc_id in HIGHLIGHTS_DOC_IDS {
            let spec = RequestSpec::get(graphql_query_url(doc_id, &variables))
                .referer(profile_url(username));
            match self.execute_json::<HighlightsResponse>(session, &spec).await {
                Ok(response) => {
                    if let Some(user) = response.data.and_then(|d| d.user) {
                        nodes = Some(user.edge_highlight_reels.edges);
                        break;
                    }
                }
                Err(e) if e.is_session_loss() || matches!(e, Error::ChallengeRequired { .. }) => {
                    return Err(e)
                }
                Err(e) => tracing::debug!("Highlights doc id {} failed: {}", doc_id, e),
            }
        }

        let nodes = nodes.ok_or_else(|| Error::NotFound(format!("highlights of @{}", username)))?;
        let mut highlights = Vec::with_capacity(nodes.len());

        for edge in nodes {
            let title = edge
                .node
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| edge.node.id.clone());

            let variables = json!({
                "reel_ids": [],
                "tag_names": [],
                "location_ids": [],
                "highlight_reel_ids": [edge.node.id],
                "precomposed_overlay": false,
                "show_story_viewer_list": false,
                "story_viewer_fetch_count": 0,
                "story_viewer_cursor": "",
                "stories_video_dash_manifest": false,
            });
            let spec = RequestSpec::get(graphql_query_url(HIGHLIGHT_ITEMS_DOC_ID, &variables))
                .referer(profile_url(username));

            self.pace().await;
            let response: HighlightItemsResponse = self.execute_json(session, &spec).await?;
            let items = response
                .data
                .map(|d| d.reels_media.into_iter().flat_map(|reel| reel.items).collect())
                .unwrap_or_default();

            highlights.push(Highlight {
                id: edge.node.id,
                title,
                items,
            });
        }

        Ok(highlights)
    }
}
