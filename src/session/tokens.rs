//! Token derivation.
//!
//! A [`TokenSet`] carries the short-lived values the web API checks on top of
//! the session cookies. It is bound to the session it was derived from and is
//! never used with another one.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use uuid::Uuid;

use crate::api::endpoints::{BASE_URL, DEFAULT_ROLLOUT_HASH};
use crate::api::response::{classify, ResponseClass};
use crate::api::transport::Transport;
use crate::error::{Error, Result};
use crate::session::cookies::{CSRF_COOKIE, SESSION_COOKIE};
use crate::session::manager::Session;
use crate::session::signer::{RequestSigner, RequestSpec};

/// Tokens derived from one session.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenSet {
    pub csrf_token: String,
    /// Signing key sent as `x-instagram-ajax`.
    pub rollout_hash: String,
    pub lsd: Option<String>,
    pub device_id: String,
    pub session_id: Option<String>,
    pub www_claim: String,
    pub refreshed_at: DateTime<Utc>,
    pub bound_to: Uuid,
    /// Session revision the set was derived at.
    pub revision: u64,
}

impl std::fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSet")
            .field("rollout_hash", &self.rollout_hash)
            .field("device_id", &self.device_id)
            .field("refreshed_at", &self.refreshed_at)
            .field("bound_to", &self.bound_to)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

impl TokenSet {
    pub fn is_bound_to(&self, session: &Session) -> bool {
        self.bound_to == session.id
    }

    fn is_current_for(&self, session: &Session, ttl: Duration) -> bool {
        self.is_bound_to(session)
            && self.revision == session.revision
            && Utc::now() - self.refreshed_at < ttl
    }

    #[cfg(test)]
    pub(crate) fn for_test(session: &Session) -> Self {
        Self {
            csrf_token: "csrf-test".to_string(),
            rollout_hash: DEFAULT_ROLLOUT_HASH.to_string(),
            lsd: None,
            device_id: session.device_id.clone(),
            session_id: session.cookies.get(SESSION_COOKIE).map(str::to_string),
            www_claim: "0".to_string(),
            refreshed_at: Utc::now(),
            bound_to: session.id,
            revision: session.revision,
        }
    }
}

/// Derives and caches token sets.
pub struct TokenDeriver {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    cache: Option<TokenSet>,
    ttl: Duration,
}

impl TokenDeriver {
    pub fn new(transport: Arc<dyn Transport>, signer: RequestSigner, ttl_minutes: i64) -> Self {
        Self {
            transport,
            signer,
            cache: None,
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Token set for `session`, reusing the cached one while it is current.
    ///
    /// When only the session's cookies changed, the cached page tokens are
    /// rebound locally with the rotated CSRF cookie instead of fetched again.
    pub async fn refresh(&mut self, session: &Session) -> Result<TokenSet> {
        check_session(session)?;

        if let Some(cached) = &self.cache {
            if cached.is_current_for(session, self.ttl) {
                return Ok(cached.clone());
            }

            if cached.is_bound_to(session) && Utc::now() - cached.refreshed_at < self.ttl {
                let mut rebound = cached.clone();
                if let Some(csrf) = session.cookies.get(CSRF_COOKIE) {
                    rebound.csrf_token = csrf.to_string();
                }
                rebound.session_id = session.cookies.get(SESSION_COOKIE).map(str::to_string);
                rebound.revision = session.revision;
                self.cache = Some(rebound.clone());
                return Ok(rebound);
            }
        }

        self.derive(session).await
    }

    /// Fresh derivation after the server rejected a token. Bypasses the cache.
    pub async fn on_token_rejected(&mut self, session: &Session) -> Result<TokenSet> {
        check_session(session)?;
        tracing::info!("Token rejected, deriving a fresh token set");
        self.cache = None;
        self.derive(session).await
    }

    pub fn clear(&mut self) {
        self.cache = None;
    }

    async fn derive(&mut self, session: &Session) -> Result<TokenSet> {
        let request = self.signer.prepare_bootstrap(
            &session.cookies,
            session.cookies.get(CSRF_COOKIE),
            &RequestSpec::get(format!("{}/", BASE_URL)),
        )?;

        let response = match classify(self.transport.execute(request).await?) {
            ResponseClass::Ok(response) => response,
            ResponseClass::NeedsReauth | ResponseClass::NeedsTokenRefresh => {
                return Err(Error::SessionExpired(
                    "token page requires a new login".to_string(),
                ))
            }
            ResponseClass::Transient(reason) => return Err(Error::Transient(reason)),
            ResponseClass::Rejected(reason) | ResponseClass::Fatal(reason) => {
                return Err(Error::Api(format!("token derivation failed: {}", reason)))
            }
        };

        let set_cookie_csrf = response
            .cookies
            .iter()
            .find(|c| c.name == CSRF_COOKIE && !c.value.is_empty())
            .map(|c| c.value.clone());

        let csrf_token = session
            .cookies
            .get(CSRF_COOKIE)
            .map(str::to_string)
            .or(set_cookie_csrf)
            .or_else(|| scrape_token(&response.body, "csrf_token"))
            .ok_or_else(|| Error::Api("no CSRF token available for session".to_string()))?;

        let tokens = TokenSet {
            csrf_token,
            rollout_hash: scrape_token(&response.body, "rollout_hash")
                .unwrap_or_else(|| DEFAULT_ROLLOUT_HASH.to_string()),
            lsd: scrape_token(&response.body, "lsd"),
            device_id: session.device_id.clone(),
            session_id: session.cookies.get(SESSION_COOKIE).map(str::to_string),
            www_claim: response
                .header("x-ig-set-www-claim")
                .unwrap_or("0")
                .to_string(),
            refreshed_at: Utc::now(),
            bound_to: session.id,
            revision: session.revision,
        };

        tracing::debug!("Derived token set for session {}", session.id);
        self.cache = Some(tokens.clone());
        Ok(tokens)
    }
}

fn check_session(session: &Session) -> Result<()> {
    if !session.valid || !session.cookies.has_valid_session() {
        return Err(Error::InvalidSession(format!(
            "session {} is not valid; restore it before deriving tokens",
            session.id
        )));
    }
    Ok(())
}

/// Extract `"<key>":"<value>"` from an HTML page.
pub(crate) fn scrape_token(body: &str, key: &str) -> Option<String> {
    let pattern = format!(r#""{}":"([^"]*)""#, regex::escape(key));
    Regex::new(&pattern)
        .ok()?
        .captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|value| !value.is_empty())
}
