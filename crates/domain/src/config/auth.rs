use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Authorization
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which identity provider flow to use when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    /// Cookie session via the `mcux` identity provider.
    Mcux,
    /// OAuth2 resource-owner password grant via the `oauth` provider.
    OauthPassword,
    /// OAuth2 client-credentials grant via the `oauth` provider.
    OauthClient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "d_provider")]
    pub provider: AuthProvider,
    #[serde(default)]
    pub username: Option<String>,
    /// Environment variable holding the password. Prompted for when unset.
    #[serde(default = "d_password_env")]
    pub password_env: String,
    /// Environment variable holding the HTTP basic client token used by the
    /// OAuth flows.
    #[serde(default = "d_client_token_env")]
    pub client_token_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: d_provider(),
            username: None,
            password_env: d_password_env(),
            client_token_env: d_client_token_env(),
        }
    }
}

impl AuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthProvider::Mcux => "mcux",
            AuthProvider::OauthPassword => "oauth_password",
            AuthProvider::OauthClient => "oauth_client",
        }
    }

    /// The `kind` the platform lists this flow's identity provider under.
    pub fn provider_kind(self) -> &'static str {
        match self {
            AuthProvider::Mcux => "mcux",
            AuthProvider::OauthPassword | AuthProvider::OauthClient => "oauth",
        }
    }
}

impl std::str::FromStr for AuthProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mcux" => Ok(AuthProvider::Mcux),
            "oauth_password" | "oauth-password" => Ok(AuthProvider::OauthPassword),
            "oauth_client" | "oauth-client" => Ok(AuthProvider::OauthClient),
            other => Err(format!(
                "unknown provider '{other}' (expected mcux, oauth_password or oauth_client)"
            )),
        }
    }
}

fn d_provider() -> AuthProvider {
    AuthProvider::Mcux
}
fn d_password_env() -> String {
    "CTMS_PASSWORD".into()
}
fn d_client_token_env() -> String {
    "CTMS_CLIENT_TOKEN".into()
}
