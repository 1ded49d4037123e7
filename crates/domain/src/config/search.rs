use serde::{Deserialize, Serialize};

/// Where feature lookups are aimed: the tenant realm and the service type
/// used to build default URI templates when the registry has no entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "d_realm")]
    pub realm: String,
    #[serde(default = "d_service_type")]
    pub service_type: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            realm: d_realm(),
            service_type: d_service_type(),
        }
    }
}

fn d_realm() -> String {
    "default".into()
}
fn d_service_type() -> String {
    "avid.mam.assets.access".into()
}
