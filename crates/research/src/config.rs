//! Research-agent runtime configuration, resolved once at process startup.

use ptx_util::http::HttpClientConfig;
use ptx_util::retry::RetryConfig;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResearchConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    pub trust_center: HttpClientConfig,
    /// The research FHIR store finalized bundles are persisted to.
    pub research_store: HttpClientConfig,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    pub projects: Vec<ProjectConfig>,
}

/// One receiving project: the endpoint name plus its consent domain at the
/// trust center.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub name: String,
    pub domain: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".into()
}

impl ResearchConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    pub fn retry(&self) -> RetryConfig {
        self.retry.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE: &str = "\
trust_center:
  base_url: http://tca:9000
research_store:
  base_url: http://rds:8080/fhir
retry:
  max_retries: 5
projects:
  - name: example
    domain: research-a
";

    #[test]
    fn parses_example_config() {
        let config = ResearchConfig::from_yaml(EXAMPLE).expect("parse config");
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.retry().max_retries, 5);
        assert_eq!(config.projects[0].domain, "research-a");
    }

    #[test]
    fn rejects_unknown_keys() {
        let yaml = format!("{EXAMPLE}concurrency: 4\n");
        assert!(ResearchConfig::from_yaml(&yaml).is_err());
    }
}
