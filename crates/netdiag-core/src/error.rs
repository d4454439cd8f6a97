// ── Core error types ──
//
// User-facing errors from netdiag-core. Consumers never see reqwest or
// rusqlite types directly: the `From` impls below translate transport and
// storage failures into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    /// The service rejected the bearer token. The session has already been
    /// torn down by the time this is returned.
    #[error("Session is no longer valid -- log in again")]
    Unauthorized,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// An authenticated operation was attempted without a live session.
    #[error("Not logged in")]
    NotAuthenticated,

    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach analysis service at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to analysis service timed out")]
    Timeout,

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Analysis service error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Change {change_id} cannot be reverted: {reason}")]
    NotRevertible { change_id: String, reason: String },

    // ── Local errors ─────────────────────────────────────────────────
    #[error("History cache error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the service rejected the session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if the request never reached the service.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::ConnectionFailed { .. } | Self::Timeout)
    }

    /// HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<netdiag_api::Error> for CoreError {
    fn from(err: netdiag_api::Error) -> Self {
        match err {
            netdiag_api::Error::Unauthorized => CoreError::Unauthorized,
            netdiag_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            netdiag_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.status().is_none() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            netdiag_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netdiag_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            netdiag_api::Error::Client { status, message }
            | netdiag_api::Error::Server { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            netdiag_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected response from service: {message}"))
            }
        }
    }
}

// ── Conversion from storage errors ───────────────────────────────────

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage {
            message: err.to_string(),
        }
    }
}
