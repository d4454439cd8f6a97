// Wire types for the analysis service
//
// Session and repair endpoints have a fixed shape and are typed here,
// leniently: every field is defaulted so a sparse payload still decodes.
// Where backends disagree on a key name, each spelling is its own field
// and an accessor picks the first one present; serde aliases would reject
// a payload carrying both. Analysis job and result payloads, apply result
// rows, and discovered devices vary too much between backend versions and
// are passed through as `serde_json::Value` for `netdiag-core` to
// normalize.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Session ──────────────────────────────────────────────────────────

/// `POST /api/auth/login` body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub host: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub site: Option<&'a str>,
}

/// `POST /api/auth/login` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginResponse {
    pub token: Option<String>,
    pub access_token: Option<String>,
    pub host: Option<String>,
    pub site: Option<String>,
    pub username: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: Option<i64>,
}

impl LoginResponse {
    /// The issued bearer token, under whichever key the backend used.
    pub fn bearer(&self) -> Option<&str> {
        first_present(&[self.token.as_deref(), self.access_token.as_deref()])
    }
}

/// `GET /api/auth/status` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub host: Option<String>,
    pub username: Option<String>,
    pub site: Option<String>,
}

/// `POST /api/auth/discover` response.
///
/// Device rows are loosely shaped; `netdiag-core` normalizes them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DiscoverResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub devices: Vec<Value>,
    pub scan_duration_ms: u64,
}

// ── Repair ───────────────────────────────────────────────────────────

/// Body shared by `preview` and `apply`.
#[derive(Debug, Serialize)]
pub struct RepairRequest<'a> {
    pub recommendation_ids: &'a [u32],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

/// `POST /api/repair/preview` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreviewResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub previews: Vec<PreviewEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PreviewEntry {
    pub index: u32,
    pub device_name: Option<String>,
    pub action: Option<String>,
    /// Setting values arrive as strings or numbers depending on the action.
    pub current_value: Value,
    pub new_value: Value,
    pub impact: Option<Impact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Impact {
    pub reason: Option<String>,
    pub risk_level: Option<String>,
}

/// `POST /api/repair/apply` response.
///
/// Result rows are decoded as `Value`: by the time this payload arrives the
/// backend has already touched the network, so no single malformed row may
/// fail the whole call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplyResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub results: Vec<Value>,
    pub summary: Option<ApplySummaryWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApplySummaryWire {
    pub applied: Option<u32>,
    pub failed: Option<u32>,
    pub skipped: Option<u32>,
    pub dry_run: Option<bool>,
}

/// `POST /api/repair/revert` body.
#[derive(Debug, Serialize)]
pub struct RevertRequest<'a> {
    pub change_id: &'a str,
}

/// `POST /api/repair/revert` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RevertResponse {
    pub reverted: bool,
    #[serde(deserialize_with = "string_or_number")]
    pub change_id: Option<String>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl RevertResponse {
    /// The refusal reason, under whichever key the backend used.
    pub fn reason(&self) -> Option<&str> {
        first_present(&[self.error.as_deref(), self.message.as_deref()])
    }
}

/// `GET /api/repair/history` and `GET /api/repair/revertable` response.
///
/// Entries are loosely shaped; `netdiag-core` normalizes them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ChangesResponse {
    #[serde(deserialize_with = "null_as_default")]
    pub changes: Vec<Value>,
}

// ── Helpers ──────────────────────────────────────────────────────────

fn first_present<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates
        .iter()
        .flatten()
        .copied()
        .find(|s| !s.trim().is_empty())
}

/// Accept `null` where a collection is expected.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Change identifiers are strings on most backends, integers on some.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_accepts_either_token_key() {
        let resp: LoginResponse =
            serde_json::from_value(json!({ "access_token": "abc" })).unwrap();
        assert_eq!(resp.bearer(), Some("abc"));

        let both: LoginResponse =
            serde_json::from_value(json!({ "token": "", "access_token": "abc" })).unwrap();
        assert_eq!(both.bearer(), Some("abc"));
    }

    #[test]
    fn revert_response_with_error_and_message() {
        let resp: RevertResponse = serde_json::from_value(json!({
            "reverted": false,
            "change_id": 5,
            "error": "device offline",
            "message": "revert failed"
        }))
        .unwrap();
        assert_eq!(resp.change_id.as_deref(), Some("5"));
        assert_eq!(resp.reason(), Some("device offline"));
    }

    #[test]
    fn apply_rows_are_kept_raw() {
        let resp: ApplyResponse = serde_json::from_value(json!({
            "results": [
                { "recommendation_index": "1", "status": null, "error": "x", "message": "y" }
            ],
            "summary": { "applied": 0, "failed": 1 }
        }))
        .unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.summary.unwrap().failed, Some(1));
    }

    #[test]
    fn discover_response_tolerates_null_devices() {
        let resp: DiscoverResponse =
            serde_json::from_value(json!({ "devices": null, "scan_duration_ms": 12 })).unwrap();
        assert!(resp.devices.is_empty());
        assert_eq!(resp.scan_duration_ms, 12);
    }

    #[test]
    fn discover_response_keeps_rows_with_duplicate_keys() {
        let resp: DiscoverResponse = serde_json::from_value(json!({
            "devices": [{ "ip": "192.168.1.1", "hostname": "udm", "name": "UDM Pro" }]
        }))
        .unwrap();
        assert_eq!(resp.devices.len(), 1);
    }
}
