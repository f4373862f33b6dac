use serde::{Deserialize, Serialize};

/// A row the import skipped at commit time (e.g. the email was registered
/// between validation and import).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowError {
    pub row_number: usize,
    pub message: String,
}

/// Final tally of a finished import job.
///
/// Serialized to JSON and carried as the payload of
/// `JobStatus::Completed`, so polling clients get the created count and
/// the per-row skips in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub created: u32,
    pub skipped: u32,
    pub row_errors: Vec<RowError>,
}
