// Token storage - two co-located key/value stores that hold the credential
//
// The cookie jar mirrors what a browser cookie would carry (path, SameSite,
// expiry) and the local storage is a plain key/value map. Both live as JSON
// files in the data directory, or purely in memory for tests. They are kept
// in sync by `AuthSession`, never written independently.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Key under which the bearer token is stored in both stores
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Key under which the token type is stored in both stores
pub const TOKEN_TYPE_KEY: &str = "token_type";
/// Lifetime of a freshly written cookie
pub const COOKIE_TTL_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Minimal key/value interface shared by both token stores
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON-file backed map
// ─────────────────────────────────────────────────────────────────────────────

struct FileMap<V> {
    path: Option<PathBuf>,
    entries: Mutex<BTreeMap<String, V>>,
}

impl<V: Serialize + DeserializeOwned + Clone> FileMap<V> {
    fn in_memory() -> Self {
        Self {
            path: None,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn open(path: &Path) -> Result<Self, StoreError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            entries: Mutex::new(entries),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, V>> {
        // A panic while holding the lock leaves a valid map behind
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn get(&self, key: &str) -> Option<V> {
        self.lock().get(key).cloned()
    }

    fn insert(&self, key: &str, value: V) -> Result<(), StoreError> {
        let mut entries = self.lock();
        entries.insert(key.to_string(), value);
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.lock();
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.persist(&entries)
    }

    /// Write-then-rename so a crash never leaves a half-written file
    fn persist(&self, entries: &BTreeMap<String, V>) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Corrupt {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cookie jar
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

/// A stored cookie with the attributes the backend's edge layer expects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub value: String,
    pub path: String,
    pub same_site: SameSite,
    pub expires: DateTime<Utc>,
}

impl Cookie {
    /// Cookie scoped to `/`, `SameSite=Lax`, expiring seven days from `now`
    pub fn session(value: &str, now: DateTime<Utc>) -> Self {
        Self {
            value: value.to_string(),
            path: "/".to_string(),
            same_site: SameSite::Lax,
            expires: now + Duration::days(COOKIE_TTL_DAYS),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

pub struct CookieJar {
    cookies: FileMap<Cookie>,
}

impl CookieJar {
    pub fn in_memory() -> Self {
        Self {
            cookies: FileMap::in_memory(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            cookies: FileMap::open(path)?,
        })
    }

    /// Full cookie record, regardless of expiry
    pub fn cookie(&self, name: &str) -> Option<Cookie> {
        self.cookies.get(name)
    }

    /// Cookie value as seen at `now`; expired cookies read as absent
    pub fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        self.cookies
            .get(name)
            .filter(|c| !c.is_expired(now))
            .map(|c| c.value)
    }

    pub fn set_at(&self, name: &str, value: &str, now: DateTime<Utc>) -> Result<(), StoreError> {
        self.cookies.insert(name, Cookie::session(value, now))
    }
}

impl KeyValueStore for CookieJar {
    fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Utc::now())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.set_at(key, value, Utc::now())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.cookies.remove(key)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Local storage
// ─────────────────────────────────────────────────────────────────────────────

pub struct LocalStorage {
    items: FileMap<String>,
}

impl LocalStorage {
    pub fn in_memory() -> Self {
        Self {
            items: FileMap::in_memory(),
        }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            items: FileMap::open(path)?,
        })
    }
}

impl KeyValueStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.items.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.items.insert(key, value.to_string())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key)
    }
}
