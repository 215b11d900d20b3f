//! # PTX Clinical Agent
//!
//! The sending agent at the clinical site. Per run it selects the consented
//! cohort, pairs each patient with their raw clinical bundle, applies stage-1
//! pseudonymization through the trust center, and transmits the resulting
//! transport bundles to the research agent. One patient's failure is
//! contained and counted; it never interrupts the run.

pub mod client;
pub mod config;
pub mod deidentify;
pub mod error;
pub mod process;
pub mod rest;
pub mod runner;
pub mod selectors;
pub mod sender;

pub use error::{ClinicalError, ClinicalResult};
pub use process::TransferProcess;
pub use runner::{RunSnapshot, RunStatus, TransferRunner};
