//! Shared state for background import jobs.
//!
//! A bulk import runs outside the request/response cycle: the import
//! endpoint registers a job, returns its id immediately, and the client
//! polls `GET /api/v1/roster/status/{job_id}` while the worker reports
//! progress. The pieces here are:
//!
//! - `JobsState`: clonable, thread-safe map of job id to `JobStatus`,
//!   injected into the Actix application state in `main.rs`.
//! - `JobUpdate`: message a worker sends to change a job's status.
//! - `start_job_updater`: the task draining `JobUpdate` messages into the
//!   shared map.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};

/// Thread-safe container for the status of every import job.
///
/// The map is the single source of truth: the status endpoint takes read
/// locks, the updater task takes the write lock. Workers never touch the
/// map directly; they send `JobUpdate`s through `tx`, which keeps progress
/// reporting decoupled from locking.
#[derive(Clone)]
pub struct JobsState {
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,
    pub tx: mpsc::Sender<JobUpdate>,
}

/// A status change for one job, sent by a worker via `JobsState.tx`.
#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: String, status: JobStatus) -> JobUpdate {
        JobUpdate { job_id, status }
    }
}

/// Drains `JobUpdate` messages into the shared map. Spawned once from
/// `main.rs` and runs for the life of the process.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        jobs.insert(update.job_id.clone(), update.status);
    }
}
