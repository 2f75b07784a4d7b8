//! Session context - single owner of the credential
//!
//! Every collaborator that needs the token (REST client, chat socket, UI)
//! holds an `Arc<AuthSession>` instead of reading the stores directly.
//! Mutation happens only through this type, which keeps the cookie jar and
//! local storage in sync and broadcasts state changes over a `watch` channel.

use super::store::{
    CookieJar, KeyValueStore, LocalStorage, StoreError, ACCESS_TOKEN_KEY, TOKEN_TYPE_KEY,
};
use crate::routes::{Navigator, LOGIN_PATH};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Token type used when none was stored
pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// A bearer credential as sent in `Authorization: <type> <value>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub value: String,
    pub token_type: String,
}

impl AuthToken {
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.value)
    }
}

/// Observable session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    SignedIn,
    /// A REST call came back 401; credentials were wiped
    Invalidated,
}

pub struct AuthSession {
    cookies: Box<dyn KeyValueStore>,
    local: Box<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    state_tx: watch::Sender<SessionState>,
    /// Armed by `set_auth`, tripped by the first `invalidate`
    invalidated: AtomicBool,
}

impl AuthSession {
    pub fn new(
        cookies: Box<dyn KeyValueStore>,
        local: Box<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let signed_in = cookies.get(ACCESS_TOKEN_KEY).is_some()
            || local.get(ACCESS_TOKEN_KEY).is_some();
        let initial = if signed_in {
            SessionState::SignedIn
        } else {
            SessionState::SignedOut
        };
        let (state_tx, _) = watch::channel(initial);

        Self {
            cookies,
            local,
            navigator,
            state_tx,
            invalidated: AtomicBool::new(false),
        }
    }

    /// Open the file-backed stores under `data_dir`
    pub fn open(data_dir: &Path, navigator: Arc<dyn Navigator>) -> Result<Self, StoreError> {
        let cookies = CookieJar::open(&data_dir.join("cookies.json"))?;
        let local = LocalStorage::open(&data_dir.join("local_storage.json"))?;
        Ok(Self::new(Box::new(cookies), Box::new(local), navigator))
    }

    pub fn in_memory(navigator: Arc<dyn Navigator>) -> Self {
        Self::new(
            Box::new(CookieJar::in_memory()),
            Box::new(LocalStorage::in_memory()),
            navigator,
        )
    }

    /// Store a fresh credential in both stores. An empty token is ignored.
    pub fn set_auth(&self, value: &str, token_type: Option<&str>) -> Result<(), StoreError> {
        if value.is_empty() {
            tracing::warn!("Ignoring empty access token");
            return Ok(());
        }
        let token_type = token_type
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TOKEN_TYPE);

        self.cookies.set(ACCESS_TOKEN_KEY, value)?;
        self.cookies.set(TOKEN_TYPE_KEY, token_type)?;
        self.local.set(ACCESS_TOKEN_KEY, value)?;
        self.local.set(TOKEN_TYPE_KEY, token_type)?;

        self.invalidated.store(false, Ordering::SeqCst);
        self.state_tx.send_replace(SessionState::SignedIn);
        tracing::info!("Credentials stored");
        Ok(())
    }

    /// Current credential: cookie first, then local storage
    pub fn token(&self) -> Option<AuthToken> {
        let value = self
            .cookies
            .get(ACCESS_TOKEN_KEY)
            .or_else(|| self.local.get(ACCESS_TOKEN_KEY))?;
        let token_type = self
            .cookies
            .get(TOKEN_TYPE_KEY)
            .or_else(|| self.local.get(TOKEN_TYPE_KEY))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string());

        Some(AuthToken { value, token_type })
    }

    pub fn is_signed_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Remove both keys from both stores.
    ///
    /// Every removal is attempted even if an earlier one fails; the first
    /// error is returned.
    fn clear(&self) -> Result<(), StoreError> {
        let results = [
            self.cookies.remove(ACCESS_TOKEN_KEY),
            self.cookies.remove(TOKEN_TYPE_KEY),
            self.local.remove(ACCESS_TOKEN_KEY),
            self.local.remove(TOKEN_TYPE_KEY),
        ];
        results.into_iter().collect()
    }

    /// User-initiated sign out
    pub fn logout(&self) -> Result<(), StoreError> {
        let result = self.clear();
        self.state_tx.send_replace(SessionState::SignedOut);
        self.navigator.navigate(LOGIN_PATH);
        result
    }

    /// Global invalidation after an authorization failure.
    ///
    /// Clears both stores and sends the user to the login entry point once;
    /// further 401s before the next `set_auth` only re-clear.
    pub fn invalidate(&self) {
        if let Err(e) = self.clear() {
            tracing::error!("Failed to clear credentials: {}", e);
        }

        if self.invalidated.swap(true, Ordering::SeqCst) {
            return;
        }

        tracing::warn!("Authorization rejected, session invalidated");
        self.state_tx.send_replace(SessionState::Invalidated);
        self.navigator.navigate(LOGIN_PATH);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Navigator that records every path it is asked to open
    #[derive(Default)]
    pub(crate) struct RecordingNavigator {
        pub paths: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        pub fn visits(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_string());
        }
    }

    fn session() -> (AuthSession, Arc<RecordingNavigator>) {
        let nav = Arc::new(RecordingNavigator::default());
        (AuthSession::in_memory(nav.clone()), nav)
    }

    #[test]
    fn test_set_auth_writes_both_stores_and_defaults_type() {
        let (session, _) = session();
        session.set_auth("tok", None).unwrap();

        assert_eq!(
            session.token(),
            Some(AuthToken {
                value: "tok".to_string(),
                token_type: "Bearer".to_string()
            })
        );
        assert_eq!(session.local.get(ACCESS_TOKEN_KEY), Some("tok".to_string()));
        assert_eq!(session.cookies.get(TOKEN_TYPE_KEY), Some("Bearer".to_string()));
        assert_eq!(session.state(), SessionState::SignedIn);
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let (session, _) = session();
        session.set_auth("", Some("Bearer")).unwrap();
        assert!(!session.is_signed_in());
    }

    #[test]
    fn test_token_falls_back_to_local_storage() {
        let (session, _) = session();
        session.local.set(ACCESS_TOKEN_KEY, "from-local").unwrap();

        let token = session.token().unwrap();
        assert_eq!(token.value, "from-local");
        assert_eq!(token.authorization(), "Bearer from-local");
    }

    #[test]
    fn test_invalidate_clears_and_navigates_once() {
        let (session, nav) = session();
        session.set_auth("tok", Some("Bearer")).unwrap();
        let mut rx = session.subscribe();

        session.invalidate();
        session.invalidate();

        assert!(session.token().is_none());
        assert_eq!(session.cookies.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(session.local.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(nav.visits(), vec!["/login".to_string()]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), SessionState::Invalidated);
    }

    #[test]
    fn test_new_login_rearms_invalidation() {
        let (session, nav) = session();
        session.set_auth("one", None).unwrap();
        session.invalidate();
        session.set_auth("two", None).unwrap();
        session.invalidate();

        assert_eq!(nav.visits().len(), 2);
    }

    #[test]
    fn test_logout_clears_and_navigates() {
        let (session, nav) = session();
        session.set_auth("tok", None).unwrap();
        session.logout().unwrap();

        assert!(!session.is_signed_in());
        assert_eq!(session.state(), SessionState::SignedOut);
        assert_eq!(nav.visits(), vec!["/login".to_string()]);
    }
}
