//! Credential lookup for the configured identity provider.
//!
//! Secrets come from the environment variables named in `[auth]`; a
//! missing password is prompted for on the terminal. The client token of
//! the OAuth flows is never prompted for.

use anyhow::Context;
use ctms_client::Credentials;
use ctms_domain::config::{AuthConfig, AuthProvider};

/// Resolve credentials from the process environment and the terminal.
pub fn resolve(auth: &AuthConfig) -> anyhow::Result<Credentials> {
    resolve_with(
        auth,
        |name| std::env::var(name).ok().filter(|v| !v.is_empty()),
        |prompt| rpassword::prompt_password_stderr(prompt),
    )
}

/// Resolve credentials with injectable environment and prompt sources.
pub fn resolve_with<E, P>(auth: &AuthConfig, env: E, prompt: P) -> anyhow::Result<Credentials>
where
    E: Fn(&str) -> Option<String>,
    P: Fn(&str) -> std::io::Result<String>,
{
    let client_token = || {
        env(&auth.client_token_env).with_context(|| {
            format!(
                "provider '{}' needs a client token in ${}",
                auth.provider.as_str(),
                auth.client_token_env
            )
        })
    };
    let user_pair = || -> anyhow::Result<(String, String)> {
        let username = auth
            .username
            .clone()
            .context("no username configured (set [auth] username or pass --username)")?;
        let password = match env(&auth.password_env) {
            Some(p) => p,
            None => prompt(&format!("Password for {username}: "))
                .context("reading password from terminal")?,
        };
        Ok((username, password))
    };

    Ok(match auth.provider {
        AuthProvider::Mcux => {
            let (username, password) = user_pair()?;
            Credentials::Mcux { username, password }
        }
        AuthProvider::OauthPassword => {
            let client_token = client_token()?;
            let (username, password) = user_pair()?;
            Credentials::OAuthPassword {
                client_token,
                username,
                password,
            }
        }
        AuthProvider::OauthClient => Credentials::OAuthClient {
            client_token: client_token()?,
        },
    })
}
