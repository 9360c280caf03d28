//! Cookie set and the persisted cookie file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Name of the authentication cookie.
pub const SESSION_COOKIE: &str = "sessionid";
pub const CSRF_COOKIE: &str = "csrftoken";
pub const USER_ID_COOKIE: &str = "ds_user_id";
pub const DEVICE_COOKIE: &str = "ig_did";

/// A single cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            expires: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires.is_some_and(|expires| expires <= Utc::now())
    }
}

/// Cookies keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet {
    cookies: BTreeMap<String, Cookie>,
}

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a live cookie.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| !c.is_expired())
            .map(|c| c.value.as_str())
    }

    /// Insert or replace a cookie. Expired or empty cookies delete the entry,
    /// matching how browsers treat a deletion `Set-Cookie`.
    ///
    /// Returns whether the set changed.
    pub fn insert(&mut self, cookie: Cookie) -> bool {
        if cookie.value.is_empty() || cookie.is_expired() {
            return self.cookies.remove(&cookie.name).is_some();
        }

        match self.cookies.get(&cookie.name) {
            Some(existing) if existing.value == cookie.value => false,
            _ => {
                self.cookies.insert(cookie.name.clone(), cookie);
                true
            }
        }
    }

    /// Absorb many cookies. Returns whether anything changed.
    pub fn extend<I: IntoIterator<Item = Cookie>>(&mut self, cookies: I) -> bool {
        let mut changed = false;
        for cookie in cookies {
            changed |= self.insert(cookie);
        }
        changed
    }

    /// `Cookie` header value with all live cookies.
    pub fn header_value(&self) -> String {
        self.cookies
            .values()
            .filter(|c| !c.is_expired())
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Whether the set carries a usable authentication cookie.
    pub fn has_valid_session(&self) -> bool {
        self.get(SESSION_COOKIE).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }
}

/// Persisted state for one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub cookies: CookieSet,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    accounts: HashMap<String, AccountRecord>,
}

/// The cookie file on disk, keyed by account.
///
/// A single process is the only writer of a given file; concurrent clients
/// for the same account must not share it.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the record for an account, if one exists.
    pub fn load(&self, account: &str) -> Result<Option<AccountRecord>> {
        let mut file = self.read_file()?;
        Ok(file.accounts.remove(&account_key(account)))
    }

    /// Overwrite the record for an account.
    pub fn save(&self, account: &str, record: &AccountRecord) -> Result<()> {
        let mut file = self.read_file()?;
        file.accounts.insert(account_key(account), record.clone());
        self.write_file(&file)
    }

    /// Remove the record for an account. Returns whether one existed.
    pub fn clear(&self, account: &str) -> Result<bool> {
        let mut file = self.read_file()?;
        let removed = file.accounts.remove(&account_key(account)).is_some();
        if removed {
            self.write_file(&file)?;
        }
        Ok(removed)
    }

    fn read_file(&self) -> Result<CookieFile> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CookieFile::default())
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&content) {
            Ok(file) => Ok(file),
            Err(e) => {
                // keep the other accounts' records recoverable before the
                // next save replaces the file
                let backup = self.path.with_extension("json.bak");
                fs::rename(&self.path, &backup)?;
                tracing::warn!(
                    "Unreadable cookie file {} ({}); moved to {}",
                    self.path.display(),
                    e,
                    backup.display()
                );
                Ok(CookieFile::default())
            }
        }
    }

    /// Write through a temporary file and rename so a crash never leaves a
    /// truncated cookie file behind.
    fn write_file(&self, file: &CookieFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_string_pretty(file)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn account_key(account: &str) -> String {
    account.trim_start_matches('@').to_lowercase()
}
