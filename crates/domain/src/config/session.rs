use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds between keep-alive calls. `0` disables the keep-alive task.
    #[serde(default = "d_120")]
    pub keep_alive_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: d_120(),
        }
    }
}

fn d_120() -> u64 {
    120
}
