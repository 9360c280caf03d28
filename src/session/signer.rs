//! Request signing.
//!
//! Turns a [`RequestSpec`] into a transport-ready [`HttpRequest`] by attaching
//! cookies, anti-forgery tokens and a user agent drawn from the rotation pool.
//! Signing is a pure function of its inputs: no network access and no
//! mutation of the session or token set.

use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;

use crate::api::endpoints::{ASBD_ID, BASE_URL};
use crate::api::transport::{HttpRequest, RequestBody};
use crate::error::{Error, Result};
use crate::session::cookies::CookieSet;
use crate::session::manager::Session;
use crate::session::tokens::TokenSet;

/// Description of a request before signing.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub referer: Option<String>,
    pub body: RequestBody,
    pub extra_headers: Vec<(&'static str, String)>,
    /// Whether the request may be re-issued after a transparent re-login.
    pub replay_safe: bool,
}

impl RequestSpec {
    fn new(method: Method, url: impl Into<String>, body: RequestBody) -> Self {
        Self {
            method,
            url: url.into(),
            referer: None,
            body,
            extra_headers: Vec::new(),
            replay_safe: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url, RequestBody::Empty)
    }

    pub fn post_form<K, V>(url: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(Method::POST, url, RequestBody::Form(fields))
    }

    pub fn post_bytes(url: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(Method::POST, url, RequestBody::Bytes(bytes))
    }

    pub fn referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.extra_headers.push((name, value.into()));
        self
    }

    /// Mark the request as non-idempotent.
    pub fn not_replay_safe(mut self) -> Self {
        self.replay_safe = false;
        self
    }
}

/// Attaches headers and tokens to outgoing requests.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    app_id: String,
    user_agents: Arc<Vec<String>>,
}

impl RequestSigner {
    pub fn new(app_id: impl Into<String>, user_agents: Vec<String>) -> Self {
        Self {
            app_id: app_id.into(),
            user_agents: Arc::new(user_agents),
        }
    }

    /// Sign a request for an authenticated session.
    ///
    /// Fails with [`Error::InvalidSession`] when the token set was derived
    /// from another session.
    pub fn prepare(
        &self,
        session: &Session,
        tokens: &TokenSet,
        spec: &RequestSpec,
    ) -> Result<HttpRequest> {
        if !tokens.is_bound_to(session) {
            return Err(Error::InvalidSession(format!(
                "token set belongs to session {}, not {}",
                tokens.bound_to, session.id
            )));
        }

        let mut headers = self.base_headers(spec)?;
        insert(&mut headers, header::COOKIE, &session.cookies.header_value())?;
        insert(&mut headers, "x-csrftoken", &tokens.csrf_token)?;
        insert(&mut headers, "x-instagram-ajax", &tokens.rollout_hash)?;
        insert(&mut headers, "x-ig-www-claim", &tokens.www_claim)?;
        if let Some(lsd) = &tokens.lsd {
            insert(&mut headers, "x-fb-lsd", lsd)?;
        }

        self.finish(headers, spec)
    }

    /// Sign an anonymous or token-fetch request from a bare cookie set.
    pub fn prepare_bootstrap(
        &self,
        cookies: &CookieSet,
        csrf_token: Option<&str>,
        spec: &RequestSpec,
    ) -> Result<HttpRequest> {
        let mut headers = self.base_headers(spec)?;
        if !cookies.is_empty() {
            insert(&mut headers, header::COOKIE, &cookies.header_value())?;
        }
        if let Some(csrf) = csrf_token {
            insert(&mut headers, "x-csrftoken", csrf)?;
        }
        insert(&mut headers, "x-ig-www-claim", "0")?;

        self.finish(headers, spec)
    }

    /// Draw a user agent for one request.
    pub fn pick_user_agent(&self) -> &str {
        self.user_agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or_default()
    }

    fn base_headers(&self, spec: &RequestSpec) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        insert(&mut headers, header::USER_AGENT, self.pick_user_agent())?;
        insert(&mut headers, "x-ig-app-id", &self.app_id)?;
        insert(&mut headers, "x-asbd-id", ASBD_ID)?;
        insert(&mut headers, "x-requested-with", "XMLHttpRequest")?;
        insert(&mut headers, header::ORIGIN, BASE_URL)?;
        let referer = spec
            .referer
            .clone()
            .unwrap_or_else(|| format!("{}/", BASE_URL));
        insert(&mut headers, header::REFERER, &referer)?;
        insert(&mut headers, "sec-fetch-site", "same-origin")?;
        insert(&mut headers, "sec-fetch-mode", "cors")?;
        insert(&mut headers, "sec-fetch-dest", "empty")?;
        insert(&mut headers, header::ACCEPT, "application/json")?;

        match spec.body {
            RequestBody::Form(_) => insert(
                &mut headers,
                header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )?,
            RequestBody::Bytes(_) => {
                insert(&mut headers, header::CONTENT_TYPE, "application/octet-stream")?
            }
            RequestBody::Empty => {}
        }

        Ok(headers)
    }

    fn finish(&self, mut headers: HeaderMap, spec: &RequestSpec) -> Result<HttpRequest> {
        for (name, value) in &spec.extra_headers {
            insert(&mut headers, *name, value)?;
        }

        Ok(HttpRequest {
            method: spec.method.clone(),
            url: spec.url.clone(),
            headers,
            body: spec.body.clone(),
        })
    }
}

fn insert<K>(headers: &mut HeaderMap, name: K, value: &str) -> Result<()>
where
    K: TryInto<HeaderName>,
{
    let name = name
        .try_into()
        .map_err(|_| Error::Api("invalid header name".to_string()))?;
    headers.insert(name, HeaderValue::from_str(value)?);
    Ok(())
}

/// Browser-style encrypted password field carrying the plain password.
pub fn enc_password(password: &str) -> String {
    format!(
        "#PWD_INSTAGRAM_BROWSER:0:{}:{}",
        Utc::now().timestamp(),
        password
    )
}
