//! CLI configuration: thin wrapper around `netdiag_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--service, --insecure, --timeout).

use std::time::Duration;

use netdiag_core::{ClientConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use netdiag_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Service address used when neither a profile nor `--service` names one.
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8000";

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref()).to_owned()
}

/// Build a `ClientConfig` for the active profile with flag overrides.
///
/// An explicitly requested profile must exist. Without one, the CLI falls
/// back to `--service` or the local default service address.
pub fn resolve_client_config(
    global: &GlobalOpts,
    config: &Config,
    profile_name: &str,
) -> Result<ClientConfig, CliError> {
    let mut client = match config.profiles.get(profile_name) {
        Some(profile) => {
            let mut profile = profile.clone();
            if let Some(ref url) = global.service {
                profile.service_url.clone_from(url);
            }
            netdiag_config::profile_to_client_config(&profile, &config.defaults)?
        }
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = config.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name.into(),
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            });
        }
        None => {
            let url_str = global.service.as_deref().unwrap_or(DEFAULT_SERVICE_URL);
            let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
                field: "service".into(),
                reason: format!("invalid URL: {url_str}"),
            })?;
            let mut client = ClientConfig::new(url);
            client.timeout = Duration::from_secs(config.defaults.timeout);
            if config.defaults.insecure {
                client.tls = TlsVerification::DangerAcceptInvalid;
            }
            client
        }
    };

    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }
    Ok(client)
}
