// ── Session manager ──
//
// Owns the one authenticated session with the analysis service. The
// bearer token itself lives in the api client's credential slot; this
// module decides when it is set, persisted, and torn down. It is also the
// client's 401 interceptor, so any rejected request anywhere in the
// process ends the session here.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use netdiag_api::{ApiClient, ResponseInterceptor};

use crate::config::ClientConfig;
use crate::error::CoreError;
use crate::model::{CachedCredentials, LoginCredentials, Session};

/// Token lifetime assumed when the login response omits `expires_in`.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 8 * 60 * 60;

/// Site used when neither the user nor the service names one.
pub const DEFAULT_SITE: &str = "default";

// ── Persistence ──────────────────────────────────────────────────────

/// Token as written to disk between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Where the session manager keeps state between process runs.
///
/// The CLI provides a file-backed store; tests and embedders can use
/// [`MemorySessionStore`].
pub trait SessionStore: Send + Sync {
    fn load_token(&self) -> Result<Option<StoredToken>, CoreError>;
    fn save_token(&self, token: &StoredToken) -> Result<(), CoreError>;
    fn clear_token(&self) -> Result<(), CoreError>;
    fn load_credentials(&self) -> Result<Option<CachedCredentials>, CoreError>;
    fn save_credentials(&self, credentials: &CachedCredentials) -> Result<(), CoreError>;
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    token: RwLock<Option<StoredToken>>,
    credentials: RwLock<Option<CachedCredentials>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load_token(&self) -> Result<Option<StoredToken>, CoreError> {
        Ok(self.token.read().clone())
    }

    fn save_token(&self, token: &StoredToken) -> Result<(), CoreError> {
        *self.token.write() = Some(token.clone());
        Ok(())
    }

    fn clear_token(&self) -> Result<(), CoreError> {
        *self.token.write() = None;
        Ok(())
    }

    fn load_credentials(&self) -> Result<Option<CachedCredentials>, CoreError> {
        Ok(self.credentials.read().clone())
    }

    fn save_credentials(&self, credentials: &CachedCredentials) -> Result<(), CoreError> {
        *self.credentials.write() = Some(credentials.clone());
        Ok(())
    }
}

// ── SessionManager ───────────────────────────────────────────────────

/// Entry point for authentication.
///
/// Cheaply cloneable via `Arc<SessionInner>`; the analysis orchestrator and
/// change workflow hold clones and reach the api client through it.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api: ApiClient,
    state: Arc<SessionState>,
}

/// The part of the manager the api client calls back into on a 401.
struct SessionState {
    session: RwLock<Option<Session>>,
    authenticated: watch::Sender<bool>,
    store: Arc<dyn SessionStore>,
}

impl SessionState {
    fn set_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    /// Forget the session and the persisted token. Cached identity stays.
    fn teardown(&self) {
        self.set_session(None);
        self.authenticated.send_replace(false);
        if let Err(e) = self.store.clear_token() {
            warn!(error = %e, "failed to clear persisted token");
        }
    }
}

impl ResponseInterceptor for SessionState {
    fn on_unauthorized(&self) {
        info!("service rejected the session token, logging out");
        self.teardown();
    }
}

impl SessionManager {
    /// Build a manager (and its api client) from connection settings.
    pub fn new(config: &ClientConfig, store: Arc<dyn SessionStore>) -> Result<Self, CoreError> {
        let api = ApiClient::new(config.base_url.clone(), &config.transport())?;
        Ok(Self::with_api(api, store))
    }

    /// Build a manager around an existing api client.
    pub fn with_api(api: ApiClient, store: Arc<dyn SessionStore>) -> Self {
        let (authenticated, _) = watch::channel(false);
        let state = Arc::new(SessionState {
            session: RwLock::new(None),
            authenticated,
            store,
        });
        api.set_interceptor(state.clone());

        Self {
            inner: Arc::new(SessionInner { api, state }),
        }
    }

    /// The raw api client. Requests attach the token if one is held.
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// The api client, or `NotAuthenticated` without a validated session.
    pub(crate) fn authorized_api(&self) -> Result<&ApiClient, CoreError> {
        if self.is_authenticated() {
            Ok(&self.inner.api)
        } else {
            Err(CoreError::NotAuthenticated)
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// True only after a successful login or validate, and only while a
    /// token is still held.
    pub fn is_authenticated(&self) -> bool {
        *self.inner.state.authenticated.borrow() && self.inner.api.credential().is_present()
    }

    pub fn session(&self) -> Option<Session> {
        self.inner.state.session.read().clone()
    }

    pub fn token(&self) -> Option<SecretString> {
        self.inner
            .api
            .credential()
            .get()
            .map(|token| token.as_ref().clone())
    }

    /// Identity remembered from the last successful login.
    pub fn cached_credentials(&self) -> Result<Option<CachedCredentials>, CoreError> {
        self.inner.state.store.load_credentials()
    }

    /// Watch the authenticated flag.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.state.authenticated.subscribe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Authenticate and start a session.
    ///
    /// Concurrent logins race on the single credential slot; the last one
    /// to finish wins.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Session, CoreError> {
        let LoginCredentials {
            host,
            username,
            password,
            site,
        } = credentials;

        let resp = self
            .inner
            .api
            .login(&host, &username, &password, site.as_deref())
            .await?;

        let token = resp
            .bearer()
            .map(str::to_owned)
            .ok_or_else(|| CoreError::AuthenticationFailed {
                message: "login response did not include a token".into(),
            })?;
        let ttl = resp
            .expires_in
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        let session = Session {
            token: SecretString::from(token.clone()),
            host: resp.host.filter(|h| !h.is_empty()).unwrap_or(host),
            username: resp.username.filter(|u| !u.is_empty()).unwrap_or(username),
            site: resp
                .site
                .or(site)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SITE.into()),
            expires_at: Utc::now() + Duration::seconds(ttl),
        };

        self.inner
            .api
            .credential()
            .set(SecretString::from(token.clone()));
        self.inner.state.set_session(Some(session.clone()));
        self.inner.state.authenticated.send_replace(true);

        let store = &self.inner.state.store;
        let stored = StoredToken {
            token,
            expires_at: session.expires_at,
        };
        if let Err(e) = store.save_token(&stored) {
            warn!(error = %e, "failed to persist session token");
        }
        if let Err(e) = store.save_credentials(&session.identity()) {
            warn!(error = %e, "failed to persist login identity");
        }

        info!(
            host = %session.host,
            username = %session.username,
            site = %session.site,
            "logged in"
        );
        Ok(session)
    }

    /// End the session. Remote invalidation is best-effort; local state is
    /// always cleared.
    pub async fn logout(&self) {
        if self.inner.api.credential().is_present() {
            if let Err(e) = self.inner.api.logout().await {
                warn!(error = %e, "remote logout failed, clearing local session anyway");
            }
        }
        self.inner.api.credential().clear();
        self.inner.state.teardown();
        info!("logged out");
    }

    /// Ask the service whether the held token is still good.
    ///
    /// A network failure or non-401 error leaves the current state alone
    /// and is returned to the caller.
    pub async fn validate(&self) -> Result<bool, CoreError> {
        if !self.inner.api.credential().is_present() {
            debug!("no token held, skipping validation");
            self.inner.state.authenticated.send_replace(false);
            return Ok(false);
        }

        match self.inner.api.auth_status().await {
            Ok(status) if status.authenticated => {
                self.refresh_identity(status.host, status.username, status.site);
                self.inner.state.authenticated.send_replace(true);
                debug!("session validated");
                Ok(true)
            }
            Ok(_) => {
                info!("service reports the session is no longer valid");
                self.inner.api.credential().clear();
                self.inner.state.teardown();
                Ok(false)
            }
            // The 401 path has already torn the session down.
            Err(netdiag_api::Error::Unauthorized) => Ok(false),
            Err(e) => {
                warn!(error = %e, "session validation failed, keeping current state");
                Err(e.into())
            }
        }
    }

    /// Load a persisted, unexpired token without marking the session
    /// authenticated. Call [`validate`](Self::validate) next.
    pub fn restore(&self) -> Result<Option<Session>, CoreError> {
        let store = &self.inner.state.store;
        let Some(stored) = store.load_token()? else {
            return Ok(None);
        };

        if stored.expires_at <= Utc::now() {
            info!(expired_at = %stored.expires_at, "discarding expired session token");
            store.clear_token()?;
            return Ok(None);
        }

        let identity = store.load_credentials()?.unwrap_or_default();
        let session = Session {
            token: SecretString::from(stored.token.clone()),
            host: identity.host,
            username: identity.username,
            site: if identity.site.is_empty() {
                DEFAULT_SITE.into()
            } else {
                identity.site
            },
            expires_at: stored.expires_at,
        };

        self.inner
            .api
            .credential()
            .set(SecretString::from(stored.token));
        self.inner.state.set_session(Some(session.clone()));
        self.inner.state.authenticated.send_replace(false);

        debug!(username = %session.username, "restored session token");
        Ok(Some(session))
    }

    /// Apply identity fields reported by `/api/auth/status`.
    fn refresh_identity(
        &self,
        host: Option<String>,
        username: Option<String>,
        site: Option<String>,
    ) {
        let mut guard = self.inner.state.session.write();

        let session = guard.get_or_insert_with(|| Session {
            token: self
                .token()
                .unwrap_or_else(|| SecretString::from(String::new())),
            host: String::new(),
            username: String::new(),
            site: DEFAULT_SITE.into(),
            expires_at: Utc::now() + Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
        });

        let before = session.identity();
        if let Some(host) = host.filter(|h| !h.is_empty()) {
            session.host = host;
        }
        if let Some(username) = username.filter(|u| !u.is_empty()) {
            session.username = username;
        }
        if let Some(site) = site.filter(|s| !s.is_empty()) {
            session.site = site;
        }

        let after = session.identity();
        drop(guard);

        if before != after {
            if let Err(e) = self.inner.state.store.save_credentials(&after) {
                warn!(error = %e, "failed to persist refreshed identity");
            }
        }
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.inner.api.base_url().as_str())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_token() {
        let store = MemorySessionStore::new();
        assert!(store.load_token().unwrap().is_none());

        let token = StoredToken {
            token: "abc".into(),
            expires_at: Utc::now(),
        };
        store.save_token(&token).unwrap();
        assert_eq!(store.load_token().unwrap(), Some(token));

        store.clear_token().unwrap();
        assert!(store.load_token().unwrap().is_none());
    }
}
