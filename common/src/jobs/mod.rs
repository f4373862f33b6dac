use serde::{Deserialize, Serialize};

/// Lifecycle of a background import job, as exposed by the status endpoint.
///
/// `InProgress` carries the percentage of rows processed (0-100).
/// `Completed` carries a JSON payload (an `ImportOutcome` for import jobs).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}
