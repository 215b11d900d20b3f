//! Per-run orchestration of the sending agent.
//!
//! `run` starts a transfer asynchronously and returns a run id immediately;
//! `status` answers later queries from an in-memory run store. Patients fan
//! out into independent pipelines whose failures are contained and counted;
//! only a failure of the cohort source itself turns the run into ERROR.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use serde::Serialize;
use tokio::time::{Duration, Instant};
use uuid::Uuid;

use ptx_api::{ConsentedPatient, ConsentedPatientBundle, SendOutcome, TransferResult};

use crate::error::{ClinicalError, ClinicalResult};
use crate::process::TransferProcess;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Queued,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Error)
    }
}

/// Point-in-time view of a run, as returned by the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub id: String,
    pub status: RunStatus,
    pub sent_bundles: u64,
    pub skipped_patients: u64,
}

/// State shared between a running transfer task and status queries.
struct RunShared {
    status: Mutex<RunStatus>,
    sent_bundles: AtomicU64,
    skipped_patients: AtomicU64,
    finished_at: Mutex<Option<Instant>>,
}

impl RunShared {
    fn new() -> Self {
        Self {
            status: Mutex::new(RunStatus::Queued),
            sent_bundles: AtomicU64::new(0),
            skipped_patients: AtomicU64::new(0),
            finished_at: Mutex::new(None),
        }
    }

    fn set_status(&self, status: RunStatus) {
        *self.status.lock().expect("status mutex poisoned") = status;
    }

    fn finish(&self, status: RunStatus) {
        self.set_status(status);
        *self.finished_at.lock().expect("finished_at mutex poisoned") = Some(Instant::now());
    }

    fn snapshot(&self, id: &str) -> RunSnapshot {
        RunSnapshot {
            id: id.to_owned(),
            status: *self.status.lock().expect("status mutex poisoned"),
            sent_bundles: self.sent_bundles.load(Ordering::SeqCst),
            skipped_patients: self.skipped_patients.load(Ordering::SeqCst),
        }
    }

    /// Terminal runs become evictable once older than the retention window;
    /// live runs never are.
    fn is_evictable(&self, retention: Duration) -> bool {
        if !self.status.lock().expect("status mutex poisoned").is_terminal() {
            return false;
        }
        self.finished_at
            .lock()
            .expect("finished_at mutex poisoned")
            .map(|finished| finished.elapsed() > retention)
            .unwrap_or(false)
    }
}

/// In-memory run registry with TTL eviction of terminal runs.
struct RunStore {
    runs: Mutex<HashMap<String, Arc<RunShared>>>,
    retention: Duration,
}

impl RunStore {
    fn new(retention: Duration) -> Self {
        Self {
            runs: Mutex::new(HashMap::new()),
            retention,
        }
    }

    fn insert(&self, id: String, run: Arc<RunShared>) {
        let mut runs = self.runs.lock().expect("run store mutex poisoned");
        runs.retain(|_, run| !run.is_evictable(self.retention));
        runs.insert(id, run);
    }

    fn get(&self, id: &str) -> Option<Arc<RunShared>> {
        let mut runs = self.runs.lock().expect("run store mutex poisoned");
        runs.retain(|_, run| !run.is_evictable(self.retention));
        runs.get(id).cloned()
    }
}

/// Starts transfer runs and answers status queries.
pub struct TransferRunner {
    store: RunStore,
    concurrency: usize,
}

impl TransferRunner {
    pub fn new(run_retention: Duration, concurrency: usize) -> Self {
        Self {
            store: RunStore::new(run_retention),
            concurrency: concurrency.max(1),
        }
    }

    /// Starts a run of the given process and returns its id immediately.
    pub fn run(&self, process: Arc<TransferProcess>) -> String {
        let run_id = Uuid::new_v4().to_string();
        tracing::info!(project = %process.project, %run_id, "starting transfer run");

        let run = Arc::new(RunShared::new());
        self.store.insert(run_id.clone(), Arc::clone(&run));
        tokio::spawn(execute(process, run, self.concurrency));

        run_id
    }

    /// Snapshot of a run, or `RunNotFound` for unknown or evicted ids.
    pub fn status(&self, run_id: &str) -> ClinicalResult<RunSnapshot> {
        self.store
            .get(run_id)
            .map(|run| run.snapshot(run_id))
            .ok_or_else(|| ClinicalError::RunNotFound(run_id.to_owned()))
    }
}

async fn execute(process: Arc<TransferProcess>, run: Arc<RunShared>, concurrency: usize) {
    run.set_status(RunStatus::Running);

    let mut results = process
        .cohort_selector
        .select_cohort()
        .map(|item| {
            let process = Arc::clone(&process);
            let run = Arc::clone(&run);
            async move {
                match item {
                    Ok(patient) => {
                        execute_patient(&process, &run, patient).await;
                        Ok(())
                    }
                    Err(e) => Err(e),
                }
            }
        })
        .buffer_unordered(concurrency);

    let mut cohort_failed = false;
    while let Some(result) = results.next().await {
        if let Err(e) = result {
            tracing::error!(project = %process.project, "cohort source failed: {e}");
            cohort_failed = true;
            break;
        }
    }
    drop(results);

    let status = if cohort_failed {
        RunStatus::Error
    } else {
        RunStatus::Completed
    };
    tracing::info!(project = %process.project, ?status, "transfer run finished");
    run.finish(status);
}

/// Containment boundary: whatever happens inside one patient's pipeline is
/// logged and counted here, never propagated into the run.
async fn execute_patient(process: &TransferProcess, run: &RunShared, patient: ConsentedPatient) {
    let patient_id = patient.id.clone();
    match patient_pipeline(process, patient).await {
        Ok(outcome) => {
            run.sent_bundles.fetch_add(outcome.bundles_sent as u64, Ordering::SeqCst);
        }
        Err(e) => {
            run.skipped_patients.fetch_add(1, Ordering::SeqCst);
            tracing::error!(patient = %patient_id, "skipping patient: {e}");
        }
    }
}

async fn patient_pipeline(
    process: &TransferProcess,
    patient: ConsentedPatient,
) -> TransferResult<SendOutcome> {
    let bundle = process.data_selector.select(&patient).await?;
    let bundle = ConsentedPatientBundle { patient, bundle };
    let transport = process.deidentifier.deidentify(bundle).await?;
    process.bundle_sender.send(transport).await
}
