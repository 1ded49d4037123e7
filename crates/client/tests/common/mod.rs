//! Shared wiremock fixtures for the platform's auth endpoints.

#![allow(dead_code)]

use ctms_client::{Credentials, HalClient, Session};
use ctms_domain::config::PlatformConfig;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "tok-123";
pub const CLIENT_TOKEN: &str = "Y2xpZW50OnNlY3JldA==";

pub fn platform(server: &MockServer) -> PlatformConfig {
    PlatformConfig {
        base_url: server.uri(),
        timeout_ms: 5_000,
        ..Default::default()
    }
}

pub fn client(server: &MockServer) -> HalClient {
    HalClient::new(&platform(server)).unwrap()
}

pub fn mcux() -> Credentials {
    Credentials::Mcux {
        username: "Administrator".into(),
        password: "secret".into(),
    }
}

pub fn oauth_password() -> Credentials {
    Credentials::OAuthPassword {
        client_token: CLIENT_TOKEN.into(),
        username: "Administrator".into(),
        password: "secret".into(),
    }
}

/// `/auth` and the identity provider list, offering the given kinds.
pub async fn mount_discovery(server: &MockServer, kinds: &[&str]) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/auth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {
                "auth:identity-providers": [
                    { "href": format!("{base}/auth/identity-providers") }
                ],
                "auth:token": [
                    { "href": format!("{base}/auth/tokens/other"), "name": "other" },
                    { "href": format!("{base}/auth/tokens/current"), "name": "current" }
                ]
            }
        })))
        .mount(server)
        .await;

    let providers: Vec<_> = kinds
        .iter()
        .map(|kind| match *kind {
            "mcux" => json!({
                "kind": "mcux",
                "_links": { "auth-mcux:login": [{ "href": format!("{base}/auth/sessions") }] }
            }),
            _ => json!({
                "kind": kind,
                "_links": { "auth:ropc-default": [{ "href": format!("{base}/auth/tokens") }] }
            }),
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/auth/identity-providers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_embedded": { "auth:identity-provider": providers }
        })))
        .mount(server)
        .await;
}

pub async fn mount_mcux_login(server: &MockServer, status: u16) {
    Mock::given(method("POST"))
        .and(path("/auth/sessions"))
        .respond_with(
            ResponseTemplate::new(status)
                .insert_header("set-cookie", "avidSession=cookie-1; Path=/")
                .insert_header("location", "/"),
        )
        .mount(server)
        .await;
}

pub async fn mount_token_endpoint(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/tokens"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

/// Current token resource plus its removal endpoint. The DELETE must be
/// seen exactly `deletes` times.
pub async fn mount_revocation(server: &MockServer, deletes: u64) {
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/auth/tokens/current"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": {
                "auth-token:removal": [{ "href": format!("{base}/auth/tokens/current") }]
            }
        })))
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/auth/tokens/current"))
        .respond_with(ResponseTemplate::new(204))
        .expect(deletes)
        .mount(server)
        .await;
}

/// A full cookie-session platform without keep-alive.
pub async fn mcux_session(server: &MockServer) -> Session {
    mount_discovery(server, &["mcux", "oauth"]).await;
    mount_mcux_login(server, 303).await;
    mount_revocation(server, 1).await;
    Session::authorize_with(client(server), &mcux(), None)
        .await
        .unwrap()
}

/// Number of requests the server saw for `method` + `path`.
pub async fn count(server: &MockServer, verb: &str, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == route)
        .count()
}
