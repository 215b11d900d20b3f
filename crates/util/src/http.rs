//! Outbound HTTP client configuration.
//!
//! Each agent talks to a handful of fixed upstreams (trust center, partner
//! agent, FHIR stores). A configured upstream is a base URL plus an auth
//! method; the same struct is deserialized from every agent's YAML config.

use serde::Deserialize;

/// How requests to an upstream are authenticated.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum AuthMethod {
    #[default]
    None,
    Basic {
        user: String,
        password: String,
    },
    Bearer {
        token: String,
    },
}

/// A configured upstream endpoint.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpClientConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthMethod,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: AuthMethod::None,
        }
    }

    /// Absolute URL for a path below the configured base.
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Applies the configured auth method to a request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            AuthMethod::None => request,
            AuthMethod::Basic { user, password } => request.basic_auth(user, Some(password)),
            AuthMethod::Bearer { token } => request.bearer_auth(token),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_url_and_path() {
        let config = HttpClientConfig::new("http://tca:9000/");
        assert_eq!(
            config.url("/api/v2/cd/transport-ids"),
            "http://tca:9000/api/v2/cd/transport-ids"
        );
    }

    #[test]
    fn parses_auth_methods_from_yaml() {
        let yaml = "base_url: http://gpas:8080/ttp-fhir/fhir/gpas\nauth:\n  type: basic\n  user: fts\n  password: secret\n";
        let config: HttpClientConfig = serde_yaml::from_str(yaml).expect("parse config");
        assert_eq!(
            config.auth,
            AuthMethod::Basic {
                user: "fts".into(),
                password: "secret".into()
            }
        );

        let yaml = "base_url: http://gpas:8080\n";
        let config: HttpClientConfig = serde_yaml::from_str(yaml).expect("parse config");
        assert_eq!(config.auth, AuthMethod::None);
    }
}
