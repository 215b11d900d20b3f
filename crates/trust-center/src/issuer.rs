//! Transport-id issuance, resolution and invalidation.
//!
//! Issuance binds a freshly generated transport id to the durable pseudonym
//! of each original identifier and files the association in the store under a
//! TTL. Resolution is single-use: an association is consumed when read, so a
//! transport id can never be replayed.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tokio::time::Duration;

use crate::error::{TrustCenterError, TrustCenterResult};
use crate::gpas::PseudonymService;
use crate::store::TransportIdStore;
use crate::tid::{tid_key, TransportIdGenerator};

/// Attempts to find an unoccupied transport id before the issuance unit of
/// work is aborted. With a 64^9 keyspace this bound is effectively never hit;
/// it exists so generation can not loop forever against a degenerate store.
const MAX_TID_ATTEMPTS: u32 = 64;

pub struct PseudonymIssuer {
    store: Arc<dyn TransportIdStore>,
    service: Arc<dyn PseudonymService>,
    generator: TransportIdGenerator,
    transport_id_ttl: Duration,
}

impl PseudonymIssuer {
    pub fn new(
        store: Arc<dyn TransportIdStore>,
        service: Arc<dyn PseudonymService>,
        generator: TransportIdGenerator,
        transport_id_ttl: Duration,
    ) -> Self {
        Self {
            store,
            service,
            generator,
            transport_id_ttl,
        }
    }

    /// Issues one transport id per original id, scoped to `domain`.
    ///
    /// Fetches (or creates) the durable pseudonyms for all ids in one batch,
    /// then files `tid:<transportId> → pseudonym` for each under the
    /// configured TTL. Losing the insert race on any key aborts the whole
    /// request: a mapping is never silently overwritten.
    ///
    /// Returns the original-id → transport-id mapping.
    pub async fn retrieve_transport_ids(
        &self,
        ids: &BTreeSet<String>,
        domain: &str,
    ) -> TrustCenterResult<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut transport_ids = HashMap::with_capacity(ids.len());
        for id in ids {
            transport_ids.insert(id.clone(), self.unique_transport_id().await?);
        }

        let pseudonyms = self.service.fetch_or_create(domain, ids).await?;
        tracing::trace!(domain, count = ids.len(), "storing pseudonym associations");

        for id in ids {
            let pseudonym = pseudonyms.get(id).ok_or_else(|| {
                TrustCenterError::MalformedResponse(format!(
                    "pseudonymization service returned no pseudonym for {id}"
                ))
            })?;
            let key = tid_key(&transport_ids[id]);
            let inserted = self
                .store
                .put_if_absent(&key, pseudonym, self.transport_id_ttl)
                .await?;
            if !inserted {
                return Err(TrustCenterError::StoreConsistency(key));
            }
        }

        Ok(transport_ids)
    }

    /// Resolves transport ids to their stored pseudonyms for the receiving
    /// agent.
    ///
    /// The result is partial: ids with no stored association are absent from
    /// the returned map instead of failing the batch. Each association is
    /// consumed on read.
    pub async fn resolve_pseudonyms(
        &self,
        transport_ids: &BTreeSet<String>,
        domain: &str,
    ) -> TrustCenterResult<HashMap<String, String>> {
        let mut resolved = HashMap::new();
        for transport_id in transport_ids {
            match self.store.take(&tid_key(transport_id)).await? {
                Some(pseudonym) => {
                    resolved.insert(transport_id.clone(), pseudonym);
                }
                None => {
                    tracing::debug!(domain, %transport_id, "transport id not resolvable");
                }
            }
        }
        Ok(resolved)
    }

    /// Explicitly invalidates transport ids, returning the count actually
    /// removed.
    pub async fn delete_transport_ids(&self, transport_ids: &BTreeSet<String>) -> TrustCenterResult<usize> {
        let keys: Vec<String> = transport_ids.iter().map(|id| tid_key(id)).collect();
        Ok(self.store.remove(&keys).await?)
    }

    /// Direct id → pseudonym lookup bypassing the transport-id indirection.
    ///
    /// An empty input yields an empty map; ids without a stored pseudonym are
    /// absent from the result rather than present with a null value.
    pub async fn fetch_pseudonymized_ids(
        &self,
        ids: &BTreeSet<String>,
    ) -> TrustCenterResult<HashMap<String, String>> {
        let mut pseudonyms = HashMap::new();
        for id in ids {
            if let Some(pseudonym) = self.store.get(&tid_key(id)).await? {
                pseudonyms.insert(id.clone(), pseudonym);
            }
        }
        Ok(pseudonyms)
    }

    /// Generates a transport id that is unoccupied in the store, within a
    /// bounded number of attempts.
    async fn unique_transport_id(&self) -> TrustCenterResult<String> {
        for _attempt in 0..MAX_TID_ATTEMPTS {
            let candidate = self.generator.candidate();
            if self.store.get(&tid_key(&candidate)).await?.is_none() {
                return Ok(candidate);
            }
        }
        Err(TrustCenterError::TransportIdExhausted(MAX_TID_ATTEMPTS))
    }
}
