//! HTTP client for the trust center's resolution endpoint.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use ptx_api::tca::TransportIdsRequest;
use ptx_api::{PseudonymResolver, TransferError, TransferResult};
use ptx_util::http::HttpClientConfig;

pub struct TrustCenterClient {
    http: reqwest::Client,
    config: HttpClientConfig,
}

impl TrustCenterClient {
    pub fn new(http: reqwest::Client, config: HttpClientConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl PseudonymResolver for TrustCenterClient {
    async fn resolve(
        &self,
        domain: &str,
        transport_ids: &BTreeSet<String>,
    ) -> TransferResult<HashMap<String, String>> {
        let request = self
            .http
            .post(self.config.url("/api/v2/rd/resolve-pseudonyms"))
            .json(&TransportIdsRequest {
                domain: domain.to_owned(),
                ids: transport_ids.clone(),
            });

        let response = self
            .config
            .authorize(request)
            .send()
            .await
            .map_err(|e| TransferError::Transient(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            return Err(TransferError::UnknownDomain(domain.to_owned()));
        }
        if status.is_server_error() {
            return Err(TransferError::Transient(format!("trust center answered {status}")));
        }
        if !status.is_success() {
            return Err(TransferError::Upstream(format!("trust center answered {status}")));
        }

        response
            .json()
            .await
            .map_err(|e| TransferError::InvalidPayload(e.to_string()))
    }
}
