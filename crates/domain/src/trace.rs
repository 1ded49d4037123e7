use serde::Serialize;

/// Structured trace events emitted across all CTMS crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    PlatformCall {
        method: String,
        endpoint: String,
        status: u16,
        duration_ms: u64,
        attempt: u32,
    },
    SessionAuthorized {
        provider: String,
        keep_alive_secs: u64,
    },
    SessionKeepAlive {
        endpoint: String,
        ok: bool,
    },
    SessionLoggedOut {
        revoked: bool,
        session_secs: i64,
    },
    RegistryResolved {
        resource: String,
        realm: String,
        outcome: String,
    },
    PageFetched {
        source: String,
        page: usize,
        items: usize,
    },
    TraversalCompleted {
        root: String,
        items: usize,
        skipped: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ctms_event");
    }
}
