//! Bulk roster import: upload, validation, background import, status.
//!
//! This module provides the HTTP API behind the admin dashboard's bulk
//! user upload. The flow is upload-then-commit: a CSV is uploaded and
//! validated synchronously, the operator reviews the per-row report, and
//! an error-free batch is then committed by a background job whose
//! progress is polled.
//!
//! The provided routes are:
//! - `GET /api/v1/roster/template`: Serves the downloadable CSV template
//!   with the expected header and one sample row per role.
//!
//! - `POST /api/v1/roster/upload`: Handles multipart/form-data uploads. It
//!   expects a `file` field with the CSV data. The file is parsed and
//!   validated, spooled to disk under a name derived from its MD5 hash,
//!   and registered as a pending batch. The response is a `RosterReport`:
//!   per-row valid/error/warning classification, aggregate counts, and the
//!   in-batch duplicate lists.
//!
//! - `POST /api/v1/roster/import`: Starts an asynchronous background job
//!   that creates the accounts of a previously uploaded, error-free batch.
//!   It immediately returns a unique `job_id`. Rows whose email or student
//!   ID turn out to be already registered are skipped and reported in the
//!   final outcome rather than failing the job.
//!
//! - `GET /api/v1/roster/status/{job_id}`: Allows clients to poll for the
//!   status of an import job. Returns the current `JobStatus` (`Pending`,
//!   `InProgress` with a 0-100 percentage, `Completed` with the
//!   `ImportOutcome` JSON, or `Failed`) from the shared `JobsState`.

use actix_web::web::{get, post, scope};
use actix_web::Scope;
use common::model::roster::RosterReport;
use common::model::user::UploadRow;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

mod import;
mod status;
mod template;
mod upload;
pub mod validate;

const API_PATH: &str = "/api/v1/roster";

/// A validated upload waiting for the operator to start the import.
pub struct PendingBatch {
    /// Hex MD5 of the uploaded bytes; identical re-uploads are collapsed
    /// onto the existing batch.
    pub md5: String,
    pub rows: Vec<UploadRow>,
    pub report: RosterReport,
}

/// Shared map of pending batches, keyed by batch id. Injected into the
/// Actix application state in `main.rs`; batches live until their import
/// succeeds or the process exits.
#[derive(Clone, Default)]
pub struct BatchStore {
    pub batches: Arc<RwLock<HashMap<String, PendingBatch>>>,
}

/// Configures and returns the Actix scope for roster import routes.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        // Route to download the CSV template.
        .route("/template", get().to(template::process))
        // Route to upload and validate a roster CSV.
        .route("/upload", post().to(upload::process))
        // Route to start the import of a validated batch.
        .route("/import", post().to(import::process))
        // Route to get the status of an ongoing import job.
        .route("/status/{job_id}", get().to(status::process))
}
