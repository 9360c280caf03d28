//! Response classification.
//!
//! Every response is sorted into one [`ResponseClass`] before business code
//! looks at it, so session loss, stale tokens and transient failures are
//! never mistaken for ordinary HTTP errors.

use serde::Deserialize;

use crate::api::transport::{floor_char_boundary, HttpResponse};

/// Outcome of a single request.
#[derive(Debug)]
pub enum ResponseClass {
    /// Usable payload.
    Ok(HttpResponse),
    /// The session is no longer authenticated.
    NeedsReauth,
    /// The CSRF token or signing key was rejected.
    NeedsTokenRefresh,
    /// The platform refused the request.
    Rejected(String),
    /// Rate limiting, 5xx, or anything else worth retrying.
    Transient(String),
    /// Unrecoverable for this request.
    Fatal(String),
}

/// Fields shared by the platform's JSON status envelopes.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    status: Option<String>,
    message: Option<String>,
    error_title: Option<String>,
    require_login: Option<bool>,
    checkpoint_url: Option<String>,
}

/// Classify a response by status code and body signals.
pub fn classify(response: HttpResponse) -> ResponseClass {
    let status = response.status;

    if (300..400).contains(&status) {
        let location = response.location().unwrap_or_default();
        if location.contains("/accounts/login") || location.contains("/challenge") {
            return ResponseClass::NeedsReauth;
        }
        return ResponseClass::Fatal(format!("Unexpected redirect to '{}'", location));
    }

    if status == 401 {
        return ResponseClass::NeedsReauth;
    }

    if status == 403 {
        if response.body.to_lowercase().contains("csrf") {
            return ResponseClass::NeedsTokenRefresh;
        }
        return ResponseClass::NeedsReauth;
    }

    if status == 429 {
        return ResponseClass::Transient("rate limited (HTTP 429)".to_string());
    }

    if status >= 500 {
        return ResponseClass::Transient(format!("HTTP {}", status));
    }

    let envelope: Envelope = serde_json::from_str(&response.body).unwrap_or_default();

    if envelope.require_login == Some(true) || envelope.message.as_deref() == Some("login_required")
    {
        return ResponseClass::NeedsReauth;
    }

    if envelope.message.as_deref() == Some("checkpoint_required") {
        return ResponseClass::Fatal(format!(
            "checkpoint required ({})",
            envelope.checkpoint_url.as_deref().unwrap_or("no checkpoint url")
        ));
    }

    if response.is_success() {
        if envelope.status.as_deref() == Some("fail") {
            return ResponseClass::Rejected(
                envelope
                    .message
                    .or(envelope.error_title)
                    .unwrap_or_else(|| "request failed".to_string()),
            );
        }
        return ResponseClass::Ok(response);
    }

    if response.body.contains("login_required") {
        return ResponseClass::NeedsReauth;
    }

    if (400..500).contains(&status) {
        let reason = envelope
            .message
            .or(envelope.error_title)
            .unwrap_or_else(|| {
                let body = &response.body;
                format!("HTTP {}: {}", status, &body[..floor_char_boundary(body, 200)])
            });
        return ResponseClass::Rejected(reason);
    }

    ResponseClass::Fatal(format!("Unexpected HTTP status {}", status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, LOCATION};

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ok_json() {
        let class = classify(response(200, r#"{"status":"ok"}"#));
        assert!(matches!(class, ResponseClass::Ok(_)));
    }

    #[test]
    fn test_ok_html() {
        let class = classify(response(200, "<html>hello</html>"));
        assert!(matches!(class, ResponseClass::Ok(_)));
    }

    #[test]
    fn test_unauthorized_needs_reauth() {
        assert!(matches!(
            classify(response(401, "")),
            ResponseClass::NeedsReauth
        ));
    }

    #[test]
    fn test_login_required_message_needs_reauth() {
        let class = classify(response(
            200,
            r#"{"message":"login_required","status":"fail"}"#,
        ));
        assert!(matches!(class, ResponseClass::NeedsReauth));

        let class = classify(response(400, r#"{"require_login":true}"#));
        assert!(matches!(class, ResponseClass::NeedsReauth));
    }

    #[test]
    fn test_login_redirect_needs_reauth() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LOCATION,
            HeaderValue::from_static("https://www.instagram.com/accounts/login/?next=/"),
        );
        let class = classify(HttpResponse {
            status: 302,
            headers,
            ..Default::default()
        });
        assert!(matches!(class, ResponseClass::NeedsReauth));
    }

    #[test]
    fn test_csrf_forbidden_needs_token_refresh() {
        let class = classify(response(403, "CSRF token missing or incorrect"));
        assert!(matches!(class, ResponseClass::NeedsTokenRefresh));

        let class = classify(response(403, "Forbidden"));
        assert!(matches!(class, ResponseClass::NeedsReauth));
    }

    #[test]
    fn test_transient_statuses() {
        assert!(matches!(
            classify(response(429, "")),
            ResponseClass::Transient(_)
        ));
        assert!(matches!(
            classify(response(503, "")),
            ResponseClass::Transient(_)
        ));
    }

    #[test]
    fn test_fail_status_is_rejected() {
        let class = classify(response(
            200,
            r#"{"status":"fail","message":"Transcode not finished yet."}"#,
        ));
        match class {
            ResponseClass::Rejected(reason) => assert_eq!(reason, "Transcode not finished yet."),
            other => panic!("unexpected class: {:?}", other),
        }
    }

    #[test]
    fn test_checkpoint_is_fatal() {
        let class = classify(response(
            400,
            r#"{"message":"checkpoint_required","checkpoint_url":"/challenge/1/"}"#,
        ));
        assert!(matches!(class, ResponseClass::Fatal(_)));
    }

    #[test]
    fn test_plain_client_error_is_rejected() {
        let class = classify(response(404, "not found"));
        assert!(matches!(class, ResponseClass::Rejected(_)));
    }
}
