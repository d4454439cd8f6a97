// HTTP client for the analysis service
//
// Wraps `reqwest::Client` with base-URL joining, bearer attachment and a
// single response chokepoint. Every endpoint method goes through `send`,
// which is where a 401 clears the credential the request carried and fires
// the interceptor.
// Endpoint groups live in `session.rs`, `analysis.rs` and `repair.rs`.

use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{Credential, ResponseInterceptor};
use crate::error::Error;
use crate::transport::TransportConfig;

/// Keys a JSON error body may carry its human-readable message under.
const ERROR_MESSAGE_KEYS: &[&str] = &["detail", "message", "error"];

/// Longest raw error body surfaced verbatim.
const MAX_ERROR_BODY: usize = 500;

/// Raw HTTP client for the analysis service.
///
/// Owns the bearer [`Credential`]. All methods return decoded payloads;
/// non-success statuses are turned into typed [`Error`]s before the caller
/// sees the response.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Credential,
    interceptor: RwLock<Option<Arc<dyn ResponseInterceptor>>>,
}

impl ApiClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the service root (e.g. `http://localhost:8000`); a
    /// trailing slash is added so relative endpoint paths join beneath it.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url: normalize_base_url(base_url),
            credential: Credential::new(),
            interceptor: RwLock::new(None),
        }
    }

    /// The service base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bearer credential slot shared by every request.
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Register the hook run after a 401 has cleared the credential.
    ///
    /// Replaces any previously registered interceptor.
    pub fn set_interceptor(&self, interceptor: Arc<dyn ResponseInterceptor>) {
        *self.interceptor.write() = Some(interceptor);
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Join a relative path (e.g. `"api/auth/login"`) onto the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("GET {url}");

        let resp = self.send(self.http.get(url)).await?;
        decode(resp).await
    }

    /// Send a POST request with optional query parameters and JSON body.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        params: &[(&str, String)],
        body: &B,
    ) -> Result<T, Error> {
        let url = self.url(path)?;
        debug!("POST {url} params={params:?}");

        let resp = self
            .send(self.http.post(url).query(params).json(body))
            .await?;
        decode(resp).await
    }

    /// Send a POST request with no body and discard the response body.
    pub(crate) async fn post_empty(&self, path: &str) -> Result<(), Error> {
        let url = self.url(path)?;
        debug!("POST {url}");

        self.send(self.http.post(url)).await.map(drop)
    }

    /// The single response chokepoint.
    ///
    /// Attaches the bearer token, sends, and classifies the status:
    /// 401 clears the credential and notifies the interceptor, any other
    /// non-success becomes `Client` / `Server` with the backend's message.
    pub(crate) async fn send(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, Error> {
        let sent_with = self.credential.get();
        let builder = match &sent_with {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        };

        let resp = builder.send().await.map_err(Error::Transport)?;
        let status = resp.status();
        trace!(%status, url = %resp.url(), "response");

        if status == reqwest::StatusCode::UNAUTHORIZED {
            self.handle_unauthorized(sent_with.as_ref());
            return Err(Error::Unauthorized);
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = error_message(status, &body);
            return Err(if status.is_server_error() {
                Error::Server {
                    status: status.as_u16(),
                    message,
                }
            } else {
                Error::Client {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        Ok(resp)
    }

    /// Tear down the credential the rejected request carried, and only that
    /// one: a 401 for a token that was since replaced by a fresh login
    /// leaves the new session alone.
    fn handle_unauthorized(&self, sent_with: Option<&Arc<SecretString>>) {
        let Some(token) = sent_with else {
            debug!("401 on a request sent without a credential, ignoring");
            return;
        };
        if !self.credential.clear_if(token) {
            debug!("401 for a credential no longer held, ignoring");
            return;
        }

        warn!("service rejected the bearer token, clearing session");
        let interceptor = self.interceptor.read().clone();
        if let Some(interceptor) = interceptor {
            interceptor.on_unauthorized();
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("credential", &self.credential)
            .finish_non_exhaustive()
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
    let body = resp.text().await?;
    let text = if body.trim().is_empty() { "null" } else { &body };
    serde_json::from_str(text).map_err(|e| {
        let preview: String = body.chars().take(200).collect();
        Error::Deserialization {
            message: format!("{e} (body preview: {preview:?})"),
            body: body.clone(),
        }
    })
}

/// Pick the most useful message out of an error response.
///
/// Prefers a string under one of [`ERROR_MESSAGE_KEYS`] in a JSON body,
/// then the raw body, then the canonical status text.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_owned();
    }

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
        for key in ERROR_MESSAGE_KEYS {
            if let Some(serde_json::Value::String(msg)) = map.get(*key) {
                return msg.clone();
            }
        }
    }

    trimmed.chars().take(MAX_ERROR_BODY).collect()
}

fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = normalize_base_url(Url::parse("http://svc:8000/netdiag").unwrap());
        assert_eq!(url.as_str(), "http://svc:8000/netdiag/");
        assert_eq!(
            url.join("api/auth/status").unwrap().as_str(),
            "http://svc:8000/netdiag/api/auth/status"
        );
    }

    #[test]
    fn error_message_prefers_json_detail() {
        let msg = error_message(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"detail":"job not found"}"#,
        );
        assert_eq!(msg, "job not found");
    }

    #[test]
    fn error_message_falls_back_to_status_text() {
        let msg = error_message(reqwest::StatusCode::SERVICE_UNAVAILABLE, "  ");
        assert_eq!(msg, "Service Unavailable");
    }

    #[test]
    fn error_message_keeps_raw_text_body() {
        let msg = error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(msg, "upstream down");
    }
}
