//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, LOCATION};

use crate::api::endpoints::LOGIN_URL;
use crate::api::transport::{HttpRequest, HttpResponse, Transport};
use crate::error::{Error, Result};
use crate::session::cookies::Cookie;

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Self {
        Self::with_outcomes(responses.into_iter().map(Ok).collect())
    }

    /// Script that may also fail at the transport level, e.g. a timeout.
    pub fn with_outcomes(outcomes: Vec<Result<HttpResponse>>) -> Self {
        Self {
            responses: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn timeout() -> Result<HttpResponse> {
        Err(Error::Transient("operation timed out".to_string()))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_matching(&self, fragment: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.contains(fragment))
            .count()
    }

    pub fn login_calls(&self) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == LOGIN_URL)
            .count()
    }

    pub fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
            ..Default::default()
        }
    }

    pub fn with_cookies(mut response: HttpResponse, cookies: &[(&str, &str)]) -> HttpResponse {
        response.cookies = cookies
            .iter()
            .map(|(name, value)| Cookie::new(*name, *value))
            .collect();
        response
    }

    pub fn csrf_bootstrap() -> HttpResponse {
        Self::with_cookies(
            Self::json(200, "<html></html>"),
            &[("csrftoken", "csrf-boot"), ("ig_did", "DEVICE-1")],
        )
    }

    pub fn login_ok(session_id: &str) -> HttpResponse {
        Self::with_cookies(
            Self::json(
                200,
                r#"{"authenticated":true,"user":true,"userId":"42","status":"ok"}"#,
            ),
            &[
                ("sessionid", session_id),
                ("ds_user_id", "42"),
                ("csrftoken", "csrf-login"),
            ],
        )
    }

    pub fn token_page() -> HttpResponse {
        Self::json(
            200,
            r#"<html><script>{"rollout_hash":"rollout-1","lsd":"lsd-1","csrf_token":"csrf-page"}</script></html>"#,
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
}

/// Bootstrap page followed by a successful login.
pub fn login_ok_script(session_id: &str) -> Vec<HttpResponse> {
    vec![
        ScriptedTransport::csrf_bootstrap(),
        ScriptedTransport::login_ok(session_id),
    ]
}

#[async_trait]
impl Transport for ScriptedTransport {
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
