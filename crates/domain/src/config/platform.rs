use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Platform connection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Scheme and host of the platform's API gateway, e.g.
    /// `https://ctms.example.com`. `/auth` and `/apis/...` hang off it.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Version segment of the service registry API
    /// (`/apis/avid.ctms.registry;version=<v>/serviceroots`).
    #[serde(default = "d_registry_version")]
    pub registry_version: String,
    /// Uniform timeout applied to every request.
    #[serde(default = "d_60000")]
    pub timeout_ms: u64,
    /// Extra attempts for GET requests that fail with 5xx or time out.
    /// Logins, POSTs and DELETEs are never retried.
    #[serde(default)]
    pub max_retries: u32,
    /// Accept any server certificate. Only for lab installations with
    /// self-signed certificates.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            registry_version: d_registry_version(),
            timeout_ms: 60_000,
            max_retries: 0,
            accept_invalid_certs: false,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "https://localhost".into()
}
fn d_registry_version() -> String {
    "0".into()
}
fn d_60000() -> u64 {
    60_000
}
