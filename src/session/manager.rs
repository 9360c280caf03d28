//! Session lifecycle: login, restore, validity and logout.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::api::endpoints::{BASE_URL, LOGIN_URL};
use crate::api::transport::Transport;
use crate::api::types::LoginResponse;
use crate::error::{Error, Result};
use crate::session::cookies::{
    AccountRecord, Cookie, CookieSet, CookieStore, CSRF_COOKIE, DEVICE_COOKIE, USER_ID_COOKIE,
};
use crate::session::signer::{enc_password, RequestSigner, RequestSpec};
use crate::session::tokens::scrape_token;

/// An authenticated session.
///
/// The manager owns the authoritative copy; callers hold clones and hand them
/// back through [`SessionManager::ensure_valid`] before every operation.
#[derive(Debug, Clone)]
pub struct Session {
    /// Local identity. A re-login yields a new identity.
    pub id: Uuid,
    pub account: String,
    pub cookies: CookieSet,
    pub user_id: Option<String>,
    pub device_id: String,
    pub logged_in_at: DateTime<Utc>,
    pub valid: bool,
    /// Bumped whenever the cookie set changes.
    pub revision: u64,
}

impl Session {
    pub fn new(
        account: &str,
        cookies: CookieSet,
        user_id: Option<String>,
        device_id: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: account.to_string(),
            cookies,
            user_id,
            device_id,
            logged_in_at: Utc::now(),
            valid: true,
            revision: 0,
        }
    }

    fn from_record(account: &str, record: AccountRecord) -> Self {
        let device_id = record
            .device_id
            .or_else(|| record.cookies.get(DEVICE_COOKIE).map(str::to_string))
            .unwrap_or_else(new_device_id);
        let user_id = record
            .user_id
            .or_else(|| record.cookies.get(USER_ID_COOKIE).map(str::to_string));

        let mut session = Session::new(account, record.cookies, user_id, device_id);
        session.logged_in_at = record.saved_at;
        session
    }

    /// Absorb cookies set by a response. Returns whether anything changed.
    pub fn absorb<I: IntoIterator<Item = Cookie>>(&mut self, cookies: I) -> bool {
        let changed = self.cookies.extend(cookies);
        if changed {
            self.revision += 1;
        }
        changed
    }

    pub fn to_record(&self) -> AccountRecord {
        AccountRecord {
            cookies: self.cookies.clone(),
            user_id: self.user_id.clone(),
            device_id: Some(self.device_id.clone()),
            saved_at: Utc::now(),
        }
    }
}

/// Login credentials, retained for transparent re-login.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Owns the live session of one account.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    signer: RequestSigner,
    store: CookieStore,
    account: String,
    credentials: Option<Credentials>,
    current: Option<Session>,
}

impl SessionManager {
    /// Create the manager and restore any persisted session for `account`.
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: RequestSigner,
        store: CookieStore,
        account: &str,
    ) -> Result<Self> {
        let mut manager = Self {
            transport,
            signer,
            store,
            account: account.to_string(),
            credentials: None,
            current: None,
        };
        manager.restore()?;
        Ok(manager)
    }

    fn restore(&mut self) -> Result<()> {
        if self.account.is_empty() {
            return Ok(());
        }

        match self.store.load(&self.account)? {
            Some(record) if record.cookies.has_valid_session() => {
                let session = Session::from_record(&self.account, record);
                tracing::info!(
                    "Restored session for @{} from {}",
                    self.account,
                    self.store.path().display()
                );
                self.current = Some(session);
            }
            Some(_) => {
                tracing::info!("Persisted session for @{} has expired", self.account);
            }
            None => {}
        }
        Ok(())
    }

    /// Retain credentials for later re-login without logging in now.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        if self.account.is_empty() {
            self.account = credentials.username.clone();
        }
        self.credentials = Some(credentials);
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref().filter(|s| s.valid)
    }

    /// Authenticate and persist the resulting cookies.
    ///
    /// Bad credentials surface as [`Error::Authentication`]; a checkpoint or
    /// two-factor demand surfaces as [`Error::ChallengeRequired`]. Neither is
    /// retried.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<Session> {
        let credentials = Credentials::new(username, password);
        let account = username.trim_start_matches('@').to_string();

        if account.to_lowercase() != self.account.to_lowercase() {
            self.current = None;
        }
        self.account = account;
        self.credentials = Some(credentials.clone());

        self.perform_login(&credentials).await
    }

    /// The live session if one exists, otherwise a fresh login with the
    /// retained credentials.
    pub async fn open(&mut self) -> Result<Session> {
        if let Some(session) = self.current() {
            return Ok(session.clone());
        }

        let credentials = self.credentials.clone().ok_or_else(|| {
            Error::Authentication(
                "no saved session and no credentials; run `login` first".to_string(),
            )
        })?;
        self.perform_login(&credentials).await
    }

    /// Return a valid session for `session`, logging in again only if the
    /// session has been invalidated.
    pub async fn ensure_valid(&mut self, session: &Session) -> Result<Session> {
        if let Some(current) = self.current() {
            if current.id != session.id {
                tracing::debug!("Session {} was replaced by {}", session.id, current.id);
            }
            return Ok(current.clone());
        }

        let credentials = self.credentials.clone().ok_or_else(|| {
            Error::Reauthentication(format!(
                "session for @{} expired and no credentials are available",
                self.account
            ))
        })?;

        tracing::info!("Session for @{} expired, logging in again", self.account);
        match self.perform_login(&credentials).await {
            Ok(session) => Ok(session),
            Err(e @ Error::ChallengeRequired { .. }) => Err(e),
            Err(e) => Err(Error::Reauthentication(e.to_string())),
        }
    }

    /// Mark a session invalid after the platform rejected it.
    pub fn invalidate(&mut self, session: &mut Session) {
        session.valid = false;
        if let Some(current) = self.current.as_mut() {
            if current.id == session.id {
                current.valid = false;
                tracing::info!("Session {} invalidated", session.id);
            }
        }
    }

    /// Take over cookie rotation observed on a caller's copy.
    pub fn update(&mut self, session: &Session) {
        if let Some(current) = self.current.as_mut() {
            if current.id == session.id && session.revision > current.revision {
                current.cookies = session.cookies.clone();
                current.revision = session.revision;
            }
        }
    }

    /// Persist the live session's current cookies.
    pub fn persist(&self) -> Result<()> {
        if let Some(session) = self.current() {
            self.store.save(&session.account, &session.to_record())?;
        }
        Ok(())
    }

    /// Clear persisted cookies and invalidate the session. No network call.
    pub fn logout(&mut self, session: &mut Session) -> Result<()> {
        session.valid = false;
        self.current = None;
        self.store.clear(&session.account)?;
        tracing::info!("Logged out @{}", session.account);
        Ok(())
    }

    /// Drop whatever is persisted for the account, including a record too
    /// stale to restore. Returns whether a record was removed.
    pub fn forget(&mut self) -> Result<bool> {
        if let Some(current) = self.current.as_mut() {
            current.valid = false;
        }
        self.current = None;
        let removed = self.store.clear(&self.account)?;
        if removed {
            tracing::info!("Removed persisted session of @{}", self.account);
        }
        Ok(removed)
    }

    async fn perform_login(&mut self, credentials: &Credentials) -> Result<Session> {
        tracing::info!("Logging in as @{}", credentials.username);

        let mut cookies = CookieSet::new();
        let bootstrap = self
            .signer
            .prepare_bootstrap(&cookies, None, &RequestSpec::get(format!("{}/", BASE_URL)))?;
        let response = self.transport.execute(bootstrap).await?;
        cookies.extend(response.cookies.iter().cloned());

        let csrf = cookies
            .get(CSRF_COOKIE)
            .map(str::to_string)
            .or_else(|| scrape_token(&response.body, "csrf_token"))
            .ok_or_else(|| {
                Error::Authentication("could not obtain a CSRF token before login".to_string())
            })?;
        if cookies.get(CSRF_COOKIE).is_none() {
            cookies.insert(Cookie::new(CSRF_COOKIE, csrf.clone()));
        }

        let form = RequestSpec::post_form(
            LOGIN_URL,
            [
                ("username", credentials.username.clone()),
                ("enc_password", enc_password(&credentials.password)),
                ("queryParams", "{}".to_string()),
                ("optIntoOneTap", "false".to_string()),
            ],
        )
        .referer(format!("{}/accounts/login/", BASE_URL));
        let request = self.signer.prepare_bootstrap(&cookies, Some(&csrf), &form)?;
        let response = self.transport.execute(request).await?;
        cookies.extend(response.cookies.iter().cloned());

        let login: LoginResponse = serde_json::from_str(&response.body).map_err(|_| {
            Error::Authentication(format!(
                "unexpected login response (HTTP {})",
                response.status
            ))
        })?;

        if login.message.as_deref() == Some("checkpoint_required") || login.checkpoint_url.is_some()
        {
            return Err(Error::ChallengeRequired {
                checkpoint: login
                    .checkpoint_url
                    .unwrap_or_else(|| "checkpoint".to_string()),
            });
        }

        if login.two_factor_required {
            let identifier = login
                .two_factor_info
                .and_then(|info| info.two_factor_identifier)
                .unwrap_or_default();
            return Err(Error::ChallengeRequired {
                checkpoint: format!("two-factor verification {}", identifier),
            });
        }

        if !login.authenticated {
            let reason = match login.user {
                Some(false) => "unknown username".to_string(),
                _ => login
                    .message
                    .unwrap_or_else(|| "invalid username or password".to_string()),
            };
            return Err(Error::Authentication(reason));
        }

        if !cookies.has_valid_session() {
            return Err(Error::Authentication(
                "login succeeded but no session cookie was set".to_string(),
            ));
        }

        let user_id = login
            .user_id
            .or_else(|| cookies.get(USER_ID_COOKIE).map(str::to_string));
        let device_id = cookies
            .get(DEVICE_COOKIE)
            .map(str::to_string)
            .unwrap_or_else(new_device_id);

        let session = Session::new(&credentials.username, cookies, user_id, device_id);
        self.store.save(&session.account, &session.to_record())?;
        tracing::info!(
            "Logged in as @{} (user id {})",
            session.account,
            session.user_id.as_deref().unwrap_or("unknown")
        );

        self.current = Some(session.clone());
        Ok(session)
    }
}

fn new_device_id() -> String {
    Uuid::new_v4().to_string().to_uppercase()
}
