//! HTTP transport seam.
//!
//! The session core never talks to reqwest directly. It builds an
//! [`HttpRequest`] description, hands it to a [`Transport`] and classifies the
//! [`HttpResponse`] it gets back. Cookies are owned by the session, so the
//! production transport runs without a cookie jar and only reports the
//! cookies the server set.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, LOCATION};
use reqwest::{redirect, Client, Method};

use crate::config::NetworkConfig;
use crate::error::{Error, Result};
use crate::session::cookies::Cookie;

/// Request body variants the core emits.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// Raw bytes, used for upload chunks.
    Bytes(Vec<u8>),
}

impl RequestBody {
    /// Number of payload bytes for raw bodies.
    pub fn byte_len(&self) -> usize {
        match self {
            RequestBody::Bytes(bytes) => bytes.len(),
            _ => 0,
        }
    }
}

/// Abstract request handed to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

/// Abstract response returned by the transport.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Cookies set by the server on this response.
    pub cookies: Vec<Cookie>,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            Error::Api(format!(
                "Failed to parse response: {} - Response: {}",
                e,
                &self.body[..floor_char_boundary(&self.body, 300)]
            ))
        })
    }

    /// The redirect target, if any.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// A header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Largest index `<= max` that lies on a char boundary of `s`.
pub(crate) fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }
    let mut index = max;
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Executes abstract requests. Implementations must not retry on their own;
/// retry decisions belong to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build the transport from network configuration.
    pub fn new(network: &NetworkConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(network.timeout_seconds));

        if let Some(proxy) = &network.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Api(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        tracing::debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers);

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Bytes(bytes) => builder.body(bytes),
        };

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Error::Transient(format!("{} {}: {}", request.method, request.url, e))
            } else {
                Error::Http(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let cookies = response
            .cookies()
            .map(|c| Cookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().map(str::to_string),
                expires: cookie_expiry(c.max_age(), c.expires()),
            })
            .collect();
        let body = response.text().await?;

        tracing::debug!("Response status: {}", status);

        Ok(HttpResponse {
            status,
            headers,
            cookies,
            body,
        })
    }
}

fn cookie_expiry(
    max_age: Option<Duration>,
    expires: Option<std::time::SystemTime>,
) -> Option<DateTime<Utc>> {
    if let Some(max_age) = max_age {
        let max_age = chrono::Duration::from_std(max_age).ok()?;
        return Some(Utc::now() + max_age);
    }
    expires.map(DateTime::<Utc>::from)
}

/// Build the plain client used for CDN media downloads.
///
/// Media URLs are pre-signed by the CDN and need neither cookies nor tokens.
pub fn build_media_client(network: &NetworkConfig) -> Result<Client> {
    let user_agent = network
        .user_agents
        .first()
        .cloned()
        .unwrap_or_default();

    let mut builder = Client::builder().user_agent(user_agent);
    if let Some(proxy) = &network.proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }

    builder
        .build()
        .map_err(|e| Error::Api(format!("Failed to create media client: {}", e)))
}
