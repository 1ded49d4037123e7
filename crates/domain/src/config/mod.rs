mod auth;
mod observability;
mod platform;
mod search;
mod session;
mod traversal;

pub use auth::*;
pub use observability::*;
pub use platform::*;
pub use search::*;
pub use session::*;
pub use traversal::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub traversal: TraversalConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut push = |severity, field: &str, message: &str| {
            errors.push(ConfigError {
                severity,
                field: field.into(),
                message: message.into(),
            })
        };

        let base = self.platform.base_url.trim();
        if base.is_empty() {
            push(
                ConfigSeverity::Error,
                "platform.base_url",
                "base_url must not be empty",
            );
        } else if !(base.starts_with("https://") || base.starts_with("http://")) {
            push(
                ConfigSeverity::Error,
                "platform.base_url",
                "base_url must start with http:// or https://",
            );
        } else if base.starts_with("http://") {
            push(
                ConfigSeverity::Warning,
                "platform.base_url",
                "plain http sends session cookies and tokens unencrypted",
            );
        }

        if self.platform.timeout_ms == 0 {
            push(
                ConfigSeverity::Error,
                "platform.timeout_ms",
                "timeout must be greater than 0",
            );
        }

        if self.platform.max_retries > MAX_RETRIES {
            push(
                ConfigSeverity::Error,
                "platform.max_retries",
                &format!("max_retries must be at most {MAX_RETRIES}"),
            );
        }

        if self.platform.accept_invalid_certs {
            push(
                ConfigSeverity::Warning,
                "platform.accept_invalid_certs",
                "server certificates are not verified (not recommended outside a lab)",
            );
        }

        if self.traversal.collection_rel.is_empty() {
            push(
                ConfigSeverity::Error,
                "traversal.collection_rel",
                "collection relation must not be empty",
            );
        }
        if self.traversal.item_rel.is_empty() {
            push(
                ConfigSeverity::Error,
                "traversal.item_rel",
                "item relation must not be empty",
            );
        }

        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            push(
                ConfigSeverity::Error,
                "observability.sample_rate",
                "sample_rate must be between 0.0 and 1.0",
            );
        }

        errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.platform.base_url, "https://localhost");
        assert_eq!(cfg.platform.registry_version, "0");
        assert_eq!(cfg.platform.timeout_ms, 60_000);
        assert_eq!(cfg.platform.max_retries, 0);
        assert_eq!(cfg.auth.provider, AuthProvider::Mcux);
        assert_eq!(cfg.auth.password_env, "CTMS_PASSWORD");
        assert_eq!(cfg.session.keep_alive_secs, 120);
        assert_eq!(cfg.traversal.collection_rel, "loc:collection");
        assert_eq!(cfg.traversal.item_rel, "loc:item");
        assert_eq!(cfg.traversal.on_error, ErrorPolicy::FailFast);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn sections_parse() {
        let cfg: Config = toml::from_str(
            r#"
            [platform]
            base_url = "https://mam.example.com"
            max_retries = 2

            [auth]
            provider = "oauth_password"
            username = "Administrator"

            [session]
            keep_alive_secs = 0

            [traversal]
            on_error = "skip_branch"

            [search]
            realm = "BEEF"
            service_type = "avid.mam.assets.access"
        "#,
        )
        .unwrap();

        assert_eq!(cfg.platform.base_url, "https://mam.example.com");
        assert_eq!(cfg.platform.max_retries, 2);
        assert_eq!(cfg.auth.provider, AuthProvider::OauthPassword);
        assert_eq!(cfg.auth.username.as_deref(), Some("Administrator"));
        assert_eq!(cfg.session.keep_alive_secs, 0);
        assert_eq!(cfg.traversal.on_error, ErrorPolicy::SkipBranch);
        assert_eq!(cfg.search.realm, "BEEF");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let res: Result<Config, _> = toml::from_str(
            r#"
            [auth]
            provider = "kerberos"
        "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn validate_flags_bad_base_url_and_timeout() {
        let mut cfg = Config::default();
        cfg.platform.base_url = "ctms.example.com".into();
        cfg.platform.timeout_ms = 0;

        let issues = cfg.validate();
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert!(fields.contains(&"platform.base_url"));
        assert!(fields.contains(&"platform.timeout_ms"));
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Error));
    }

    #[test]
    fn validate_warns_on_plain_http_and_tolerant_tls() {
        let mut cfg = Config::default();
        cfg.platform.base_url = "http://lab-ctms".into();
        cfg.platform.accept_invalid_certs = true;

        let issues = cfg.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == ConfigSeverity::Warning));
    }

    #[test]
    fn provider_names_and_kinds() {
        assert_eq!(AuthProvider::OauthClient.provider_kind(), "oauth");
        assert_eq!(AuthProvider::Mcux.provider_kind(), "mcux");
        assert_eq!(AuthProvider::OauthPassword.as_str(), "oauth_password");
    }

    #[test]
    fn provider_parses_from_flag_values() {
        assert_eq!("mcux".parse::<AuthProvider>(), Ok(AuthProvider::Mcux));
        assert_eq!(
            "OAuth-Client".parse::<AuthProvider>(),
            Ok(AuthProvider::OauthClient)
        );
        assert!("kerberos".parse::<AuthProvider>().unwrap_err().contains("kerberos"));
    }

    #[test]
    fn display_includes_severity_tag() {
        let issue = ConfigError {
            severity: ConfigSeverity::Warning,
            field: "platform.base_url".into(),
            message: "plain http".into(),
        };
        assert_eq!(issue.to_string(), "[WARN] platform.base_url: plain http");
    }
}
