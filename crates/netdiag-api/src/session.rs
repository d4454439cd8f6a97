// Session endpoints
//
// Bearer-token login/logout, token status, and the discovery scan that
// lives under the same `/api/auth/` prefix on the service.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::client::ApiClient;
use crate::error::Error;
use crate::models::{AuthStatus, DiscoverResponse, LoginRequest, LoginResponse};

impl ApiClient {
    /// Authenticate against a controller through the service.
    ///
    /// `POST /api/auth/login`
    ///
    /// Does not touch the credential slot; the caller decides what to keep.
    /// A 401/403 or a response without a token becomes
    /// [`Error::Authentication`].
    pub async fn login(
        &self,
        host: &str,
        username: &str,
        password: &SecretString,
        site: Option<&str>,
    ) -> Result<LoginResponse, Error> {
        debug!(host, username, "logging in");

        let body = LoginRequest {
            host,
            username,
            password: password.expose_secret(),
            site,
        };

        let resp: LoginResponse = match self.post("api/auth/login", &[], &body).await {
            Ok(resp) => resp,
            Err(Error::Unauthorized) => {
                return Err(Error::Authentication {
                    message: "invalid username or password".into(),
                });
            }
            Err(Error::Client { status, message }) if status == 400 || status == 403 => {
                return Err(Error::Authentication { message });
            }
            Err(e) => return Err(e),
        };

        if resp.bearer().is_none() {
            return Err(Error::Authentication {
                message: "login response did not include a token".into(),
            });
        }

        debug!("login successful");
        Ok(resp)
    }

    /// Invalidate the current token on the service.
    ///
    /// `POST /api/auth/logout`
    pub async fn logout(&self) -> Result<(), Error> {
        debug!("logging out");
        self.post_empty("api/auth/logout").await
    }

    /// Ask the service whether the current token is still valid.
    ///
    /// `GET /api/auth/status`
    pub async fn auth_status(&self) -> Result<AuthStatus, Error> {
        self.get("api/auth/status").await
    }

    /// Scan a subnet for candidate controllers.
    ///
    /// `POST /api/auth/discover?subnet=`
    ///
    /// The scan is bounded by the service's own timeout.
    pub async fn discover(&self, subnet: Option<&str>) -> Result<DiscoverResponse, Error> {
        let params: Vec<(&str, String)> = subnet
            .map(|s| vec![("subnet", s.to_owned())])
            .unwrap_or_default();
        debug!(?subnet, "starting discovery scan");
        self.post("api/auth/discover", &params, &serde_json::json!({}))
            .await
    }
}
