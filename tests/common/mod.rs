//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};

use instagram_client::api::endpoints::LOGIN_URL;
use instagram_client::api::{HttpRequest, HttpResponse, Transport};
use instagram_client::session::Cookie;
use instagram_client::{Config, Error, InstagramClient, Result};

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct Script {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Script {
    pub fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Self::with_outcomes(responses.into_iter().map(Ok).collect())
    }

    /// Script that may also fail at the transport level.
    pub fn with_outcomes(outcomes: Vec<Result<HttpResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn login_calls(&self) -> usize {
        self.requests().iter().filter(|r| r.url == LOGIN_URL).count()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for Script {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Api(format!("no scripted response for {}", url))))
    }
}

pub fn json(status: u16, body: &str) -> HttpResponse {
    HttpResponse {
        status,
        body: body.to_string(),
        ..Default::default()
    }
}

pub fn ok() -> HttpResponse {
    json(200, r#"{"status":"ok"}"#)
}

fn with_cookies(mut response: HttpResponse, cookies: &[(&str, &str)]) -> HttpResponse {
    response.cookies = cookies
        .iter()
        .map(|(name, value)| Cookie::new(*name, *value))
        .collect();
    response
}

/// Anonymous root page followed by an accepted login.
pub fn login(session_id: &str) -> Vec<HttpResponse> {
    vec![
        with_cookies(json(200, "<html></html>"), &[("csrftoken", "csrf-boot")]),
        with_cookies(
            json(200, r#"{"authenticated":true,"user":true,"userId":"42","status":"ok"}"#),
            &[("sessionid", session_id), ("ds_user_id", "42"), ("csrftoken", "csrf-login")],
        ),
    ]
}

pub fn token_page(rollout: &str) -> HttpResponse {
    json(
        200,
        &format!(
            r#"<html><script>{{"rollout_hash":"{}","lsd":"lsd-1"}}</script></html>"#,
            rollout
        ),
    )
}

pub fn login_redirect() -> HttpResponse {
    let mut headers = HeaderMap::new();
    headers.insert(
        LOCATION,
        HeaderValue::from_static("https://www.instagram.com/accounts/login/"),
    );
    HttpResponse {
        status: 302,
        headers,
        ..Default::default()
    }
}

pub fn config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.account.username = "alice".to_string();
    config.account.password = Some("pw".to_string());
    config.account.cookie_file = Some(dir.join("cookies.json"));
    config.options.request_delay_min_ms = 0;
    config.options.request_delay_max_ms = 0;
    config.options.show_progress = false;
    config
}

pub fn client(config: Config, script: &Arc<Script>) -> InstagramClient {
    InstagramClient::with_transport(config, script.clone()).unwrap()
}
