//! # PTX Research Agent
//!
//! The receiving agent at the research site. For each transport bundle posted
//! by a clinical agent it resolves the carried transport ids into durable
//! pseudonyms through the trust center (stage-2 pseudonymization) and persists
//! the resulting bundle in the research FHIR store. Failures propagate to the
//! sending side; there is no per-patient containment here.

pub mod client;
pub mod config;
pub mod deidentify;
pub mod error;
pub mod process;
pub mod rest;
pub mod runner;
pub mod sender;

pub use error::ResearchError;
pub use process::TransferProcess;
pub use runner::{run, Phase, RunResult};
