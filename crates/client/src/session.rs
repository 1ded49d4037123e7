//! Authorized sessions against the platform.
//!
//! Session lifecycle:
//! - [`Session::authorize`] discovers the identity provider through
//!   `GET /auth`, logs in, and starts the session's keep-alive task.
//! - Every call made through [`Session::client`] carries the session
//!   (cookie jar or `avidAccessToken` cookie).
//! - [`Session::logout`] stops the keep-alive task and revokes the current
//!   token. It consumes the session, so it cannot run twice.
//!
//! [`Session::scope`] wraps the whole lifecycle around a closure and logs
//! out on every exit path.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ctms_domain::config::{AuthProvider, PlatformConfig, SessionConfig};
use ctms_domain::error::{Error, Result};
use ctms_domain::trace::TraceEvent;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::hal::HalResource;
use crate::keepalive::{KeepAlive, KeepAliveTarget};
use crate::transport::{read_json, HalClient, HalTransport, JSON};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const AUTH_PATH: &str = "/auth";

const IDENTITY_PROVIDERS_REL: &str = "auth:identity-providers";
const IDENTITY_PROVIDER_REL: &str = "auth:identity-provider";
const MCUX_LOGIN_REL: &str = "auth-mcux:login";
const OAUTH_LOGIN_REL: &str = "auth:ropc-default";
const TOKEN_REL: &str = "auth:token";
const TOKEN_REMOVAL_REL: &str = "auth-token:removal";
const CURRENT_TOKEN: &str = "current";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credentials
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What to log in with.
///
/// `Debug` is manually implemented to redact secrets.
#[derive(Clone)]
pub enum Credentials {
    /// Cookie session through the `mcux` provider.
    Mcux { username: String, password: String },
    /// OAuth2 password grant. `client_token` is the HTTP basic token
    /// issued for the calling application.
    OAuthPassword {
        client_token: String,
        username: String,
        password: String,
    },
    /// OAuth2 client-credentials grant.
    OAuthClient { client_token: String },
}

impl Credentials {
    pub fn provider(&self) -> AuthProvider {
        match self {
            Credentials::Mcux { .. } => AuthProvider::Mcux,
            Credentials::OAuthPassword { .. } => AuthProvider::OauthPassword,
            Credentials::OAuthClient { .. } => AuthProvider::OauthClient,
        }
    }

    fn login_rel(&self) -> &'static str {
        match self {
            Credentials::Mcux { .. } => MCUX_LOGIN_REL,
            _ => OAUTH_LOGIN_REL,
        }
    }

    fn keep_alive_target(&self) -> KeepAliveTarget {
        match self {
            Credentials::Mcux { .. } => KeepAliveTarget::Ping,
            _ => KeepAliveTarget::TokenExtension,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Mcux { username, .. } => f
                .debug_struct("Mcux")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::OAuthPassword { username, .. } => f
                .debug_struct("OAuthPassword")
                .field("client_token", &"[REDACTED]")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::OAuthClient { .. } => f
                .debug_struct("OAuthClient")
                .field("client_token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Response from the OAuth token endpoint.
///
/// `Debug` is manually implemented to redact secrets.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Logins answer either with a 2xx or with a 303 to the landing page.
fn login_accepted(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::SEE_OTHER
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// An authorized session and its keep-alive task.
#[derive(Debug)]
pub struct Session {
    client: HalClient,
    provider: AuthProvider,
    authorized_at: DateTime<Utc>,
    keep_alive: Option<KeepAlive>,
    open: bool,
}

impl Session {
    /// Open a session with a fresh client built from `platform`.
    ///
    /// A `keep_alive_secs` of 0 authorizes without a keep-alive task.
    pub async fn authorize(
        platform: &PlatformConfig,
        session: &SessionConfig,
        credentials: &Credentials,
    ) -> Result<Self> {
        let client = HalClient::new(platform)?;
        let interval =
            (session.keep_alive_secs > 0).then(|| Duration::from_secs(session.keep_alive_secs));
        Self::authorize_with(client, credentials, interval).await
    }

    /// Open a session on an existing client.
    pub async fn authorize_with(
        client: HalClient,
        credentials: &Credentials,
        keep_alive: Option<Duration>,
    ) -> Result<Self> {
        let provider = credentials.provider();
        let login_href = discover_login(&client, credentials).await?;

        match credentials {
            Credentials::Mcux { username, password } => {
                let body = json!({ "username": username, "password": password });
                let resp = client
                    .send(Method::POST, &login_href, JSON, |rb| rb.json(&body))
                    .await?;
                if !login_accepted(resp.status()) {
                    return Err(Error::Auth(format!(
                        "login as '{username}' rejected with status {}",
                        resp.status().as_u16()
                    )));
                }
            }
            Credentials::OAuthPassword {
                client_token,
                username,
                password,
            } => {
                let form = [
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                ];
                request_token(&client, &login_href, client_token, &form).await?;
            }
            Credentials::OAuthClient { client_token } => {
                let form = [("grant_type", "client_credentials")];
                request_token(&client, &login_href, client_token, &form).await?;
            }
        }

        let keep_alive_secs = keep_alive.map_or(0, |d| d.as_secs());
        let keep_alive = keep_alive.map(|interval| {
            KeepAlive::start(client.clone(), credentials.keep_alive_target(), interval)
        });

        TraceEvent::SessionAuthorized {
            provider: provider.as_str().to_owned(),
            keep_alive_secs,
        }
        .emit();
        tracing::info!(
            provider = provider.as_str(),
            base_url = client.base_url(),
            "session authorized"
        );

        Ok(Self {
            client,
            provider,
            authorized_at: Utc::now(),
            keep_alive,
            open: true,
        })
    }

    /// Stop the keep-alive task and revoke the current token.
    ///
    /// The keep-alive task is stopped whatever happens during revocation;
    /// a revocation failure is returned afterwards.
    pub async fn logout(mut self) -> Result<()> {
        if let Some(ka) = self.keep_alive.take() {
            ka.stop().await;
        }

        let revoked = revoke_current_token(&self.client).await;
        self.client.set_access_token(None);
        self.open = false;

        TraceEvent::SessionLoggedOut {
            revoked: revoked.is_ok(),
            session_secs: (Utc::now() - self.authorized_at).num_seconds(),
        }
        .emit();
        match &revoked {
            Ok(()) => tracing::info!("session logged out"),
            Err(e) => tracing::warn!(error = %e, "token revocation failed"),
        }
        revoked
    }

    /// Run `f` with the session's client, then log out on every path.
    ///
    /// When both `f` and the logout fail, the error from `f` is returned and
    /// the logout error is logged.
    pub async fn scope<F, Fut, T, E>(self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(HalClient) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let outcome = f(self.client.clone()).await;
        let logout = self.logout().await;
        match (outcome, logout) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(logout_err)) => {
                tracing::warn!(error = %logout_err, "logout after failed operation also failed");
                Err(e)
            }
        }
    }

    pub fn client(&self) -> &HalClient {
        &self.client
    }

    pub fn provider(&self) -> AuthProvider {
        self.provider
    }

    pub fn authorized_at(&self) -> DateTime<Utc> {
        self.authorized_at
    }

    pub fn is_keep_alive_running(&self) -> bool {
        self.keep_alive.as_ref().is_some_and(KeepAlive::is_running)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        if let Some(ka) = self.keep_alive.take() {
            ka.cancel();
        }
        tracing::warn!(
            provider = self.provider.as_str(),
            "session dropped without logout; the platform token is left to expire"
        );
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Protocol steps
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn get_auth_resource(client: &HalClient, url: &str) -> Result<HalResource> {
    HalResource::from_value(client.get_json(url, JSON).await?)
}

async fn identity_providers(client: &HalClient) -> Result<HalResource> {
    let auth = get_auth_resource(client, &client.url(AUTH_PATH)).await?;
    let providers_href = auth
        .link(IDENTITY_PROVIDERS_REL)
        .ok_or_else(|| Error::Auth("platform does not list identity providers".into()))?;
    get_auth_resource(client, &providers_href.href).await
}

/// The `kind` of every identity provider the platform offers, without
/// logging in.
pub async fn offered_providers(client: &HalClient) -> Result<Vec<String>> {
    let providers = identity_providers(client).await?;
    Ok(providers
        .embedded(IDENTITY_PROVIDER_REL)
        .iter()
        .filter_map(|p| p.property_str("kind").map(str::to_owned))
        .collect())
}

/// `/auth` → identity providers → provider of the right kind → login href.
async fn discover_login(client: &HalClient, credentials: &Credentials) -> Result<String> {
    let kind = credentials.provider().provider_kind();

    let providers = identity_providers(client).await?;
    let provider = providers
        .embedded(IDENTITY_PROVIDER_REL)
        .iter()
        .find(|p| p.property_str("kind") == Some(kind))
        .ok_or_else(|| Error::Auth(format!("identity provider '{kind}' is not offered")))?;

    let rel = credentials.login_rel();
    provider
        .link(rel)
        .map(|l| l.href.clone())
        .ok_or_else(|| Error::Auth(format!("identity provider '{kind}' has no '{rel}' link")))
}

async fn request_token(
    client: &HalClient,
    login_href: &str,
    client_token: &str,
    form: &[(&str, &str)],
) -> Result<()> {
    let resp = client
        .send(Method::POST, login_href, JSON, |rb| {
            rb.header(reqwest::header::AUTHORIZATION, format!("Basic {client_token}"))
                .form(form)
        })
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(Error::Auth(format!(
            "token request rejected with status {}",
            status.as_u16()
        )));
    }

    let token: TokenResponse = serde_json::from_value(read_json(resp).await?)
        .map_err(|e| Error::Auth(format!("token response has no access token: {e}")))?;
    tracing::debug!(expires_in = ?token.expires_in, "access token issued");
    client.set_access_token(Some(token.access_token));
    Ok(())
}

/// `/auth` → current token → removal link → DELETE.
async fn revoke_current_token(client: &HalClient) -> Result<()> {
    let auth = get_auth_resource(client, &client.url(AUTH_PATH)).await?;
    let current = auth
        .link_named(TOKEN_REL, CURRENT_TOKEN)
        .ok_or_else(|| Error::Auth("platform lists no current token".into()))?;

    let token = get_auth_resource(client, &current.href).await?;
    let removal = token
        .link(TOKEN_REMOVAL_REL)
        .ok_or_else(|| Error::Auth("current token has no removal link".into()))?;

    client.delete(&removal.href).await?;
    Ok(())
}
