//! Per-request orchestration of the receiving agent.
//!
//! One transport bundle per invocation: count what arrived, resolve the
//! transport ids (stage-2), persist the result. Unlike the sending side there
//! is no containment; any stage failure propagates to the caller, which
//! reports it back to the sending agent.

use serde::Serialize;

use ptx_api::{TransferResult, TransportBundle};

use crate::process::TransferProcess;

/// Terminal phase of a receiving run.
///
/// A receiving run is synchronous within its request, so only terminal phases
/// ever cross the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Completed,
    Error,
}

/// Outcome of one receiving run, as reported back to the sending agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub phase: Phase,
    pub received_resources: usize,
    pub sent_resources: usize,
}

/// Runs one transport bundle through the receiving pipeline.
pub async fn run(process: &TransferProcess, bundle: TransportBundle) -> TransferResult<RunResult> {
    let received_resources = bundle.bundle.resource_count();
    tracing::debug!(
        project = %process.project,
        resources = received_resources,
        "received transport bundle"
    );

    let finalized = process.deidentifier.deidentify(bundle).await?;
    let sent_resources = process.persister.persist(finalized).await?;

    Ok(RunResult {
        phase: Phase::Completed,
        received_resources,
        sent_resources,
    })
}
