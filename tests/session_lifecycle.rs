mod common;

use instagram_client::session::RequestSpec;
use instagram_client::Error;
use tempfile::TempDir;

use common::{client, config, json, login, login_redirect, ok, token_page, Script};

const ENDPOINT: &str = "https://www.instagram.com/api/v1/users/web_profile_info/?username=bob";

#[tokio::test]
async fn restored_session_skips_login() {
    let dir = TempDir::new().unwrap();

    let first = Script::new(login("sess-1"));
    let mut app = client(config(dir.path()), &first);
    let session = app.login("alice", "pw").await.unwrap();
    app.persist(&session).unwrap();

    let second = Script::new(vec![token_page("r1"), ok()]);
    let mut restarted = client(config(dir.path()), &second);
    let mut restored = restarted.connect().await.unwrap();
    restarted
        .execute(&mut restored, &RequestSpec::get(ENDPOINT))
        .await
        .unwrap();

    assert_eq!(second.login_calls(), 0);
    assert_eq!(second.remaining(), 0);
}

#[tokio::test]
async fn expired_session_is_renewed_once_and_request_replayed() {
    let dir = TempDir::new().unwrap();
    let mut responses = login("sess-1");
    responses.extend([token_page("r1"), login_redirect()]);
    responses.extend(login("sess-2"));
    responses.extend([token_page("r2"), ok()]);
    let script = Script::new(responses);

    let mut app = client(config(dir.path()), &script);
    let mut session = app.connect().await.unwrap();
    app.execute(&mut session, &RequestSpec::get(ENDPOINT))
        .await
        .unwrap();

    assert_eq!(script.login_calls(), 2);
    let replayed = script.requests().pop().unwrap();
    assert_eq!(replayed.url, ENDPOINT);
    assert_eq!(replayed.headers["x-instagram-ajax"], "r2");
    assert!(replayed.headers["cookie"]
        .to_str()
        .unwrap()
        .contains("sessionid=sess-2"));

    // the renewed session is what gets persisted
    app.persist(&session).unwrap();
    let saved = std::fs::read_to_string(dir.path().join("cookies.json")).unwrap();
    assert!(saved.contains("sess-2"));
}

#[tokio::test]
async fn repeated_token_derivation_yields_usable_tokens() {
    let dir = TempDir::new().unwrap();
    let mut settings = config(dir.path());
    settings.tokens.ttl_minutes = 0;

    let mut responses = login("sess-1");
    responses.extend([token_page("r1"), ok(), token_page("r2"), ok()]);
    let script = Script::new(responses);

    let mut app = client(settings, &script);
    let mut session = app.connect().await.unwrap();
    app.execute(&mut session, &RequestSpec::get(ENDPOINT))
        .await
        .unwrap();
    app.execute(&mut session, &RequestSpec::get(ENDPOINT))
        .await
        .unwrap();

    let ajax: Vec<String> = script
        .requests()
        .iter()
        .filter(|r| r.url == ENDPOINT)
        .map(|r| r.headers["x-instagram-ajax"].to_str().unwrap().to_string())
        .collect();
    assert_eq!(ajax, vec!["r1", "r2"]);
    assert_eq!(script.login_calls(), 1);
}

#[tokio::test]
async fn bad_credentials_are_not_retried() {
    let dir = TempDir::new().unwrap();
    let mut responses = login("unused");
    responses[1] = json(
        200,
        r#"{"authenticated":false,"user":true,"status":"ok"}"#,
    );
    let script = Script::new(responses);

    let mut app = client(config(dir.path()), &script);
    let err = app.login("alice", "wrong").await.unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert_eq!(script.login_calls(), 1);
    assert!(app.sessions().current().is_none());
}

#[tokio::test]
async fn logout_forgets_persisted_cookies() {
    let dir = TempDir::new().unwrap();
    let script = Script::new(login("sess-1"));
    let mut app = client(config(dir.path()), &script);
    let mut session = app.connect().await.unwrap();
    app.persist(&session).unwrap();

    app.logout(&mut session).unwrap();
    assert!(!session.valid);

    let empty = Script::new(Vec::new());
    let mut settings = config(dir.path());
    settings.account.password = None;
    let mut restarted = client(settings, &empty);
    assert!(matches!(
        restarted.connect().await,
        Err(Error::Authentication(_))
    ));
    assert!(empty.requests().is_empty());
}

#[tokio::test]
async fn login_timeout_is_surfaced_without_retry() {
    let dir = TempDir::new().unwrap();
    let mut outcomes: Vec<_> = login("sess-1").into_iter().map(Ok).collect();
    outcomes[1] = Err(Error::Transient("operation timed out".to_string()));
    let script = Script::with_outcomes(outcomes);

    let mut app = client(config(dir.path()), &script);
    let err = app.connect().await.unwrap_err();

    assert!(matches!(err, Error::Transient(_)));
    assert_eq!(script.login_calls(), 1);
    assert!(!dir.path().join("cookies.json").exists());
}
