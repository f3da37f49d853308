//! Session persistence.
//!
//! The console keeps five values between requests: the auth token, an
//! optional refresh token, cached credentials for silent re-login, the
//! user's role and the MyNutanix email of SSO users. A `SessionStore`
//! holds them as strings; `Session` layers typed accessors on top.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sherlock_common::Result;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
    AuthToken,
    RefreshToken,
    Creds,
    Role,
    MyNutanixEmail,
}

impl SessionKey {
    pub const ALL: [SessionKey; 5] = [
        SessionKey::AuthToken,
        SessionKey::RefreshToken,
        SessionKey::Creds,
        SessionKey::Role,
        SessionKey::MyNutanixEmail,
    ];

    /// Storage name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AuthToken => "sherlock_auth_token",
            SessionKey::RefreshToken => "sherlock_refresh_token",
            SessionKey::Creds => "sherlock_creds",
            SessionKey::Role => "sherlock_role",
            SessionKey::MyNutanixEmail => "sherlock_mynutanix_email",
        }
    }
}

/// Key/value backing for a `Session`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: SessionKey) -> Result<Option<String>>;
    async fn set(&self, key: SessionKey, value: String) -> Result<()>;
    /// Remove one key. Removing an absent key is not an error.
    async fn clear(&self, key: SessionKey) -> Result<()>;
}

// ── In-memory store ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: RwLock<HashMap<SessionKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>> {
        Ok(self.values.read().await.get(&key).cloned())
    }

    async fn set(&self, key: SessionKey, value: String) -> Result<()> {
        self.values.write().await.insert(key, value);
        Ok(())
    }

    async fn clear(&self, key: SessionKey) -> Result<()> {
        self.values.write().await.remove(&key);
        Ok(())
    }
}

// ── File-backed store ────────────────────────────────────────────────────────

/// JSON file keyed by `SessionKey::as_str`. Every write rewrites the file.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open the store at `path`, loading existing values if the file exists.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "opened session file");
        Ok(Self { path, values: RwLock::new(values) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(values)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key.as_str()).cloned())
    }

    async fn set(&self, key: SessionKey, value: String) -> Result<()> {
        let mut values = self.values.write().await;
        values.insert(key.as_str().to_string(), value);
        self.persist(&values).await
    }

    async fn clear(&self, key: SessionKey) -> Result<()> {
        let mut values = self.values.write().await;
        if values.remove(key.as_str()).is_some() {
            self.persist(&values).await?;
        }
        Ok(())
    }
}

// ── Typed session ────────────────────────────────────────────────────────────

/// Cached login credentials. The password never appears in `Debug` output.
#[derive(Debug)]
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: SecretString::from(password.into()) }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCreds {
    username: String,
    password: String,
}

#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    pub async fn auth_token(&self) -> Result<Option<String>> {
        self.store.get(SessionKey::AuthToken).await
    }

    pub async fn set_auth_token(&self, token: impl Into<String>) -> Result<()> {
        self.store.set(SessionKey::AuthToken, token.into()).await
    }

    pub async fn clear_auth_token(&self) -> Result<()> {
        self.store.clear(SessionKey::AuthToken).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(SessionKey::RefreshToken).await
    }

    pub async fn set_refresh_token(&self, token: impl Into<String>) -> Result<()> {
        self.store.set(SessionKey::RefreshToken, token.into()).await
    }

    /// Cached credentials. A corrupt entry is treated as absent.
    pub async fn credentials(&self) -> Result<Option<Credentials>> {
        let Some(raw) = self.store.get(SessionKey::Creds).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<StoredCreds>(&raw) {
            Ok(c) if !c.username.is_empty() => Ok(Some(Credentials::new(c.username, c.password))),
            Ok(_) => Ok(None),
            Err(e) => {
                warn!("Ignoring unreadable cached credentials: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn set_credentials(&self, creds: &Credentials) -> Result<()> {
        let stored = StoredCreds {
            username: creds.email.clone(),
            password: creds.password.expose_secret().to_string(),
        };
        self.store.set(SessionKey::Creds, serde_json::to_string(&stored)?).await
    }

    pub async fn role(&self) -> Result<Option<String>> {
        self.store.get(SessionKey::Role).await
    }

    pub async fn set_role(&self, role: impl Into<String>) -> Result<()> {
        self.store.set(SessionKey::Role, role.into()).await
    }

    pub async fn set_mynutanix_email(&self, email: impl Into<String>) -> Result<()> {
        self.store.set(SessionKey::MyNutanixEmail, email.into()).await
    }

    /// Name shown for the signed-in user. The MyNutanix email of SSO users
    /// wins over the cached credentials' email.
    pub async fn display_name(&self) -> Result<Option<String>> {
        if let Some(email) = self.store.get(SessionKey::MyNutanixEmail).await? {
            if !email.is_empty() {
                return Ok(Some(email));
            }
        }
        Ok(self.credentials().await?.map(|c| c.email))
    }

    /// Remove every session key.
    pub async fn logout(&self) -> Result<()> {
        for key in SessionKey::ALL {
            self.store.clear(key).await?;
        }
        debug!("session cleared");
        Ok(())
    }
}
