// ── Session domain types ──

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// What the user typed at the login prompt.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    /// Controller address the service should authenticate against.
    pub host: String,
    pub username: String,
    pub password: SecretString,
    /// Controller site; the service picks its own default when `None`.
    pub site: Option<String>,
}

/// Non-secret identity kept between runs to prefill the login prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedCredentials {
    pub host: String,
    pub username: String,
    pub site: String,
}

/// An authenticated session with the analysis service.
///
/// The token is redacted from `Debug` output by `SecretString`.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: SecretString,
    pub host: String,
    pub username: String,
    pub site: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn identity(&self) -> CachedCredentials {
        CachedCredentials {
            host: self.host.clone(),
            username: self.username.clone(),
            site: self.site.clone(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
