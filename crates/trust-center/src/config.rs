//! Trust-center runtime configuration, resolved once at process startup.

use ptx_util::http::HttpClientConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrustCenterConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// The external pseudonymization service.
    pub gpas: HttpClientConfig,
    /// Lifetime of a transport-id association in the store.
    #[serde(default = "default_transport_id_ttl_secs")]
    pub transport_id_ttl_secs: u64,
}

fn default_listen_addr() -> String {
    "0.0.0.0:9000".into()
}

fn default_transport_id_ttl_secs() -> u64 {
    10 * 60
}

impl TrustCenterConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}
