use crate::api::error::Result;
use crate::api::models::{LoginResponse, Role};
use crate::storage::{Storage, KEY_ROLE, KEY_SELLER_ID, KEY_TOKEN, KEY_USER_ID};
use directories::BaseDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = match option_env!("SOUK_API_URL") {
    Some(url) => url,
    None => "http://localhost:5000",
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval_secs: 5,
            request_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    fn toml_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("souk.toml"))
    }

    /// Config file first, then `SOUK_API_URL` from the environment on top.
    pub fn load() -> Self {
        let mut config = Self::toml_path()
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_default();
        if let Ok(url) = std::env::var("SOUK_API_URL") {
            if !url.trim().is_empty() {
                config.base_url = crate::utils::normalize_url(&url);
            }
        }
        config
    }

    pub fn load_from(path: &Path) -> Option<Self> {
        let text = fs::read_to_string(path).ok()?;
        match toml::from_str::<AppConfig>(&text) {
            Ok(config) => Some(config),
            Err(e) => {
                log::warn!("[config] ignoring malformed {}: {e}", path.display());
                None
            }
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        match Self::toml_path() {
            Some(path) => self.save_to(&path),
            None => Err(std::io::Error::new(std::io::ErrorKind::NotFound, "No config dir")),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, toml)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Credentials for the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub role: Option<Role>,
    pub user_id: Option<String>,
    pub seller_id: Option<String>,
}

impl From<LoginResponse> for Session {
    fn from(resp: LoginResponse) -> Self {
        let non_empty = |s: String| if s.is_empty() { None } else { Some(s) };
        Self {
            token: non_empty(resp.token),
            role: Some(resp.role),
            user_id: non_empty(resp.user_id),
            seller_id: resp.seller_id.and_then(non_empty),
        }
    }
}

/// Shared session read by the HTTP client at request time and written by
/// the login/logout flows.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<RwLock<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self { inner: Arc::new(RwLock::new(session)) }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.read().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.read().user_id.clone()
    }

    pub fn seller_id(&self) -> Option<String> {
        self.inner.read().seller_id.clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.inner.read().role
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.read().token.is_some()
    }

    pub fn replace(&self, session: Session) {
        *self.inner.write() = session;
    }

    pub fn clear(&self) {
        *self.inner.write() = Session::default();
    }

    pub fn restore(storage: &Storage) -> Result<Self> {
        let session = Session {
            token: storage.get(KEY_TOKEN)?,
            role: storage.get(KEY_ROLE)?.as_deref().and_then(Role::parse),
            user_id: storage.get(KEY_USER_ID)?,
            seller_id: storage.get(KEY_SELLER_ID)?,
        };
        Ok(Self::new(session))
    }

    pub fn persist(&self, storage: &Storage) -> Result<()> {
        let session = self.snapshot();
        let role = session.role.map(|r| r.as_str().to_string());
        for (key, value) in [
            (KEY_TOKEN, session.token),
            (KEY_ROLE, role),
            (KEY_USER_ID, session.user_id),
            (KEY_SELLER_ID, session.seller_id),
        ] {
            match value {
                Some(v) => storage.set(key, &v)?,
                None => storage.remove(key)?,
            }
        }
        Ok(())
    }
}
