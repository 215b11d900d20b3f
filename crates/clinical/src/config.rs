//! Clinical-agent runtime configuration, resolved once at process startup.

use std::collections::BTreeSet;

use ptx_util::http::HttpClientConfig;
use ptx_util::retry::RetryConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClinicalConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub trust_center: HttpClientConfig,
    pub research_agent: HttpClientConfig,
    /// The clinical FHIR store data is selected from.
    pub clinical_store: HttpClientConfig,
    /// Upper bound on patient pipelines in flight per run.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// How long terminal runs stay queryable before eviction.
    #[serde(default = "default_run_retention_secs")]
    pub run_retention_secs: u64,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    pub projects: Vec<ProjectConfig>,
}

/// One transfer project: a named process with its consent domain, policy set
/// and pre-consented cohort.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub policies: BTreeSet<String>,
    #[serde(default)]
    pub cohort: Vec<CohortPatientConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CohortPatientConfig {
    pub id: String,
    #[serde(default)]
    pub policies: BTreeSet<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_concurrency() -> usize {
    4
}

fn default_run_retention_secs() -> u64 {
    24 * 60 * 60
}

impl ClinicalConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}
