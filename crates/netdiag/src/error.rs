//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netdiag_config::ConfigError;
use netdiag_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the analysis service at {url}")]
    #[diagnostic(
        code(netdiag::connection_failed),
        help(
            "Check that the service is running and reachable.\n\
             Reason: {reason}\n\
             Override the address with --service or the profile's service_url."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(netdiag::timeout),
        help("Increase the timeout with --timeout or check service responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────

    #[error("Login failed: {message}")]
    #[diagnostic(
        code(netdiag::auth_failed),
        help("Check the controller host, username and password for profile '{profile}'.")
    )]
    AuthFailed { message: String, profile: String },

    #[error("Not logged in")]
    #[diagnostic(code(netdiag::not_logged_in), help("Run: netdiag login"))]
    NotLoggedIn,

    #[error("Session expired or was rejected by the service")]
    #[diagnostic(code(netdiag::session_expired), help("Run: netdiag login"))]
    SessionExpired,

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(netdiag::no_credentials),
        help(
            "Pass --password, set NETDIAG_PASSWORD, or store one with: netdiag config init"
        )
    )]
    NoCredentials { profile: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(netdiag::not_found),
        help("Run: netdiag {list_command} to see what is available")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("Change '{change_id}' cannot be reverted: {reason}")]
    #[diagnostic(
        code(netdiag::not_revertible),
        help("Run: netdiag changes revertable to list changes that can be reverted")
    )]
    NotRevertible { change_id: String, reason: String },

    // ── Jobs ─────────────────────────────────────────────────────────

    #[error("Analysis job {job_id} failed: {message}")]
    #[diagnostic(code(netdiag::job_failed))]
    JobFailed { job_id: String, message: String },

    #[error("Analysis job {job_id} still running after {attempts} status checks")]
    #[diagnostic(
        code(netdiag::job_pending),
        help("Keep waiting with: netdiag analyze wait {job_id} --max-attempts <N>")
    )]
    JobStillRunning { job_id: String, attempts: u32 },

    // ── API ──────────────────────────────────────────────────────────

    #[error("Analysis service error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(netdiag::api_error))]
    ApiError { status: Option<u16>, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netdiag::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netdiag::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: netdiag config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(netdiag::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("'{action}' requires confirmation")]
    #[diagnostic(
        code(netdiag::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Local storage / IO ───────────────────────────────────────────

    #[error("Local storage error: {message}")]
    #[diagnostic(code(netdiag::storage))]
    Storage { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(netdiag::internal))]
    Internal(String),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout | Self::JobStillRunning { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. }
            | Self::NotLoggedIn
            | Self::SessionExpired
            | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::NotRevertible { .. } => exit_code::CONFLICT,
            Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::ProfileNotFound { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::Timeout => CliError::Timeout,

            CoreError::Unauthorized => CliError::SessionExpired,

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed {
                message,
                profile: "current".into(),
            },

            CoreError::NotAuthenticated => CliError::NotLoggedIn,

            CoreError::NotRevertible { change_id, reason } => {
                CliError::NotRevertible { change_id, reason }
            }

            CoreError::Api { message, status } => CliError::ApiError { status, message },

            CoreError::Storage { message } => CliError::Storage { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_stable() {
        let cases = [
            (CoreError::Unauthorized, exit_code::AUTH),
            (CoreError::NotAuthenticated, exit_code::AUTH),
            (
                CoreError::ConnectionFailed {
                    url: "http://x".into(),
                    reason: "refused".into(),
                },
                exit_code::CONNECTION,
            ),
            (CoreError::Timeout, exit_code::TIMEOUT),
            (
                CoreError::NotRevertible {
                    change_id: "1".into(),
                    reason: "it was a dry run".into(),
                },
                exit_code::CONFLICT,
            ),
            (
                CoreError::Api {
                    message: "boom".into(),
                    status: Some(500),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            let label = core.to_string();
            assert_eq!(CliError::from(core).exit_code(), code, "{label}");
        }
    }

    #[test]
    fn api_error_message_includes_status() {
        let err = CliError::ApiError {
            status: Some(502),
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Analysis service error (502): bad gateway");
    }
}
