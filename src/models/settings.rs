use serde::{Deserialize, Serialize};

/// Application-wide switches that may change while transfers are running
///
/// Published through a `tokio::sync::watch` channel; each watchdog reads the latest
/// value at the start of every cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Workers route chunks through upstream proxies
    #[serde(default = "default_smart_proxy")]
    pub smart_proxy_enabled: bool,
}

fn default_smart_proxy() -> bool {
    true
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            smart_proxy_enabled: default_smart_proxy(),
        }
    }
}
