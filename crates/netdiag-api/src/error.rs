use thiserror::Error;

/// Top-level error type for the `netdiag-api` crate.
///
/// Covers every failure mode of the analysis service surface:
/// authentication, transport, HTTP status errors, and payload decoding.
/// `netdiag-core` maps these into user-facing diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The service answered 401. The request layer has already cleared
    /// the bearer credential by the time this is returned.
    #[error("Unauthorized -- session is no longer valid")]
    Unauthorized,

    /// Login was rejected (wrong credentials, unreachable controller, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── HTTP status ─────────────────────────────────────────────────
    /// A 4xx other than 401. `message` is the backend's body when it sent
    /// one, otherwise the canonical status text.
    #[error("Request rejected (HTTP {status}): {message}")]
    Client { status: u16, message: String },

    /// A 5xx from the service.
    #[error("Service error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` for an explicit 401 rejection.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Returns `true` if the request never produced an HTTP response.
    ///
    /// Transport failures must never be treated as an auth rejection.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Transport(e) => e.status().is_none(),
            _ => false,
        }
    }
}
