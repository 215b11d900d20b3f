//! Transmission of transport bundles to the research agent.

use async_trait::async_trait;

use ptx_api::{SendOutcome, TransferError, TransferResult, TransportBundle, TransportBundleSender};
use ptx_util::http::HttpClientConfig;
use ptx_util::retry::RetryConfig;

/// Posts transport bundles to the receiving agent's per-project endpoint,
/// retrying transient failures within the configured bound.
pub struct ResearchAgentSender {
    http: reqwest::Client,
    config: HttpClientConfig,
    project: String,
    retry: RetryConfig,
}

impl ResearchAgentSender {
    pub fn new(
        http: reqwest::Client,
        config: HttpClientConfig,
        project: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            http,
            config,
            project: project.into(),
            retry,
        }
    }

    async fn post_bundle(&self, bundle: &TransportBundle) -> TransferResult<SendOutcome> {
        let path = format!("/api/v2/{}/patient", self.project);
        let request = self.http.post(self.config.url(&path)).json(bundle);

        let response = self
            .config
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransferError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(TransferError::Transient(format!(
                "research agent answered {status}"
            )));
        }
        if !status.is_success() {
            return Err(TransferError::Upstream(format!(
                "research agent answered {status}"
            )));
        }
        Ok(SendOutcome { bundles_sent: 1 })
    }
}

#[async_trait]
impl TransportBundleSender for ResearchAgentSender {
    async fn send(&self, bundle: TransportBundle) -> TransferResult<SendOutcome> {
        tracing::trace!(project = %self.project, "sending transport bundle");
        self.retry.run(|| self.post_bundle(&bundle)).await
    }
}
