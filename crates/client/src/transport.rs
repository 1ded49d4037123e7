//! HTTP transport for the platform.
//!
//! [`HalClient`] wraps a `reqwest::Client` that is configured once per
//! session and reused for every call in it: the cookie jar carries cookie
//! sessions, and a shared token slot carries OAuth sessions. The
//! [`HalTransport`] trait is the seam the registry, page walker and tree
//! traverser are written against.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use ctms_domain::config::PlatformConfig;
use ctms_domain::error::{Error, Result};
use ctms_domain::trace::TraceEvent;
use parking_lot::RwLock;
use reqwest::{redirect, Client, Method, RequestBuilder, Response, Url};
use serde_json::Value;
use uuid::Uuid;

use crate::hal::HalResource;

pub const HAL_JSON: &str = "application/hal+json";
pub const JSON: &str = "application/json";

/// Cookie name the platform expects OAuth access tokens under.
const ACCESS_TOKEN_COOKIE: &str = "avidAccessToken";

/// Error bodies longer than this are cut before they end up in messages.
const MAX_ERROR_BODY: usize = 512;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transport trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read/write access to HAL resources.
///
/// Implementations must resolve relative hrefs against [`base_url`] and
/// fail with [`Error::Status`] on a non-success response.
///
/// [`base_url`]: HalTransport::base_url
#[async_trait]
pub trait HalTransport: Send + Sync {
    /// Scheme and host of the platform, without a trailing slash.
    fn base_url(&self) -> &str;

    /// GET `url` and parse the body as JSON.
    async fn get_json(&self, url: &str, accept: &str) -> Result<Value>;

    /// POST a JSON body to `url` and parse the response as JSON.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value>;

    /// GET `url` as `application/hal+json`.
    async fn get_resource(&self, url: &str) -> Result<HalResource> {
        HalResource::from_value(self.get_json(url, HAL_JSON).await?)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// HTTP client bound to one platform.
///
/// Cloning is cheap and clones share the connection pool, the cookie jar
/// and the access token.
#[derive(Debug, Clone)]
pub struct HalClient {
    http: Client,
    base_url: String,
    access_token: Arc<RwLock<Option<String>>>,
    timeout: Duration,
    max_retries: u32,
}

impl HalClient {
    /// Build a new client from the shared `PlatformConfig`.
    pub fn new(cfg: &PlatformConfig) -> Result<Self> {
        let base_url = cfg.base_url.trim().trim_end_matches('/').to_owned();
        Url::parse(&base_url)
            .map_err(|e| Error::Config(format!("invalid platform base_url '{base_url}': {e}")))?;

        let timeout = Duration::from_millis(cfg.timeout_ms);
        let http = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            // The login endpoints answer 303; the status is the signal.
            .redirect(redirect::Policy::none())
            .danger_accept_invalid_certs(cfg.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            access_token: Arc::new(RwLock::new(None)),
            timeout,
            max_retries: cfg.max_retries,
        })
    }

    /// The configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build the full URL for a path like `/auth`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Resolve an href taken from a response. Absolute hrefs pass through.
    pub fn resolve(&self, href: &str) -> Result<Url> {
        let base = Url::parse(&format!("{}/", self.base_url))
            .map_err(|e| Error::Config(format!("invalid base_url: {e}")))?;
        base.join(href)
            .map_err(|e| Error::Parse(format!("invalid href '{href}': {e}")))
    }

    /// Install or clear the OAuth access token sent with every request.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.read().is_some()
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Decorate a `RequestBuilder` with the standard headers.
    fn decorate(&self, rb: RequestBuilder, accept: &str) -> RequestBuilder {
        let mut rb = rb
            .header(reqwest::header::ACCEPT, accept)
            .header("X-Trace-Id", Uuid::new_v4().to_string());

        if let Some(ref token) = *self.access_token.read() {
            rb = rb.header(
                reqwest::header::COOKIE,
                format!("{ACCESS_TOKEN_COOKIE}={token}"),
            );
        }
        rb
    }

    /// Send a request and return the raw response, whatever its status.
    ///
    /// GET requests are retried with exponential back-off on 5xx and on
    /// transport failures, up to `max_retries` extra attempts; other
    /// methods are sent exactly once. Emits a `TraceEvent::PlatformCall`
    /// after every attempt.
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        accept: &str,
        customize: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let target = self.resolve(url)?;
        let retries = if method == Method::GET {
            self.max_retries
        } else {
            0
        };

        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(retry_backoff(attempt)).await;
            }

            let start = Instant::now();
            let rb = self.decorate(self.http.request(method.clone(), target.clone()), accept);
            let result = customize(rb).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let status = match &result {
                Ok(resp) => resp.status().as_u16(),
                Err(e) => e.status().map(|s| s.as_u16()).unwrap_or(0),
            };
            TraceEvent::PlatformCall {
                method: method.to_string(),
                endpoint: target.path().to_owned(),
                status,
                duration_ms,
                attempt,
            }
            .emit();

            let can_retry = attempt < retries;
            match result {
                Ok(resp) if resp.status().is_server_error() && can_retry => {
                    tracing::debug!(%method, url = %target, status, attempt, "server error, retrying");
                }
                Ok(resp) => return Ok(resp),
                Err(e) if can_retry => {
                    tracing::debug!(%method, url = %target, error = %e, attempt, "request failed, retrying");
                }
                Err(e) => return Err(from_reqwest(e)),
            }
            attempt += 1;
        }
    }

    /// Like [`HalClient::send`], turning a non-success status into
    /// [`Error::Status`].
    pub(crate) async fn send_checked(
        &self,
        method: Method,
        url: &str,
        accept: &str,
        customize: impl Fn(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response> {
        let resp = self.send(method.clone(), url, accept, customize).await?;
        if resp.status().is_success() {
            Ok(resp)
        } else {
            Err(status_error(&method, resp).await)
        }
    }

    /// Issue a DELETE and return the (successful) status code.
    pub async fn delete(&self, url: &str) -> Result<u16> {
        let resp = self.send_checked(Method::DELETE, url, JSON, |rb| rb).await?;
        Ok(resp.status().as_u16())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl HalTransport for HalClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, url: &str, accept: &str) -> Result<Value> {
        let resp = self.send_checked(Method::GET, url, accept, |rb| rb).await?;
        read_json(resp).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let resp = self
            .send_checked(Method::POST, url, HAL_JSON, |rb| rb.json(body))
            .await?;
        read_json(resp).await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read a response body and parse it as JSON.
pub(crate) async fn read_json(resp: Response) -> Result<Value> {
    let url = resp.url().to_string();
    let body = resp.text().await.map_err(from_reqwest)?;
    serde_json::from_str(&body).map_err(|e| {
        Error::Parse(format!(
            "response from {url} is not JSON: {e}: {}",
            truncate(&body)
        ))
    })
}

/// Build an [`Error::Status`] from a non-success response.
pub(crate) async fn status_error(method: &Method, resp: Response) -> Error {
    let url = resp.url().to_string();
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Error::Status {
        method: method.to_string(),
        url,
        status,
        body: truncate(&body).to_owned(),
    }
}

fn truncate(body: &str) -> &str {
    if body.len() <= MAX_ERROR_BODY {
        return body;
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Delay before retry `attempt` (1-based): 100 ms doubling per attempt,
/// capped at [`MAX_BACKOFF`].
fn retry_backoff(attempt: u32) -> Duration {
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(100u64.saturating_mul(factor)).min(MAX_BACKOFF)
}

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(retry_backoff(1), Duration::from_millis(100));
        assert_eq!(retry_backoff(2), Duration::from_millis(200));
        assert_eq!(retry_backoff(4), Duration::from_millis(800));
        assert_eq!(retry_backoff(20), MAX_BACKOFF);
        assert_eq!(retry_backoff(65), MAX_BACKOFF);
        assert_eq!(retry_backoff(u32::MAX), MAX_BACKOFF);
    }

    fn client(base: &str) -> HalClient {
        HalClient::new(&PlatformConfig {
            base_url: base.into(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn base_url_is_normalised() {
        let c = client("https://ctms.example.com/");
        assert_eq!(c.base_url(), "https://ctms.example.com");
        assert_eq!(c.url("/auth"), "https://ctms.example.com/auth");
    }

    #[test]
    fn invalid_base_url_is_a_config_error() {
        let err = HalClient::new(&PlatformConfig {
            base_url: "not a url".into(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn relative_hrefs_resolve_against_base() {
        let c = client("https://ctms.example.com");
        assert_eq!(
            c.resolve("/apis/avid.ctms.registry;version=0/serviceroots")
                .unwrap()
                .as_str(),
            "https://ctms.example.com/apis/avid.ctms.registry;version=0/serviceroots"
        );
        assert_eq!(
            c.resolve("https://other.example/auth").unwrap().as_str(),
            "https://other.example/auth"
        );
    }

    #[test]
    fn token_slot_is_shared_between_clones() {
        let c = client("https://ctms.example.com");
        let keep_alive_copy = c.clone();
        c.set_access_token(Some("tok".into()));
        assert!(keep_alive_copy.has_access_token());
        keep_alive_copy.set_access_token(None);
        assert!(!c.has_access_token());
    }

    #[test]
    fn timeout_comes_from_config() {
        let c = HalClient::new(&PlatformConfig {
            timeout_ms: 1_500,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(c.timeout(), Duration::from_millis(1_500));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(MAX_ERROR_BODY);
        let cut = truncate(&body);
        assert!(cut.len() <= MAX_ERROR_BODY);
        assert!(body.starts_with(cut));
    }
}
