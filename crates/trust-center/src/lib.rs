//! # PTX Trust Center
//!
//! The trust center mediates between the clinical and research sites without
//! ever seeing clinical content, only identifiers. It owns the transport-id
//! store, issues short-lived transport ids bound to durable pseudonyms, and
//! resolves them exactly once for the receiving agent.

pub mod config;
pub mod error;
pub mod gpas;
pub mod issuer;
pub mod rest;
pub mod store;
pub mod tid;

pub use error::{TrustCenterError, TrustCenterResult};
pub use issuer::PseudonymIssuer;
pub use store::{InMemoryStore, StoreError, TransportIdStore};
