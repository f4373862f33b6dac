use serde::{Deserialize, Serialize};

/// The primary classification of a validated roster row.
///
/// Every row gets exactly one status. A row with both blocking and
/// non-blocking issues is `Error`: error takes precedence over warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Valid,
    Error,
    Warning,
}

/// Per-row validation outcome, in the same order as the uploaded file.
///
/// `issues` holds human-readable messages; blocking issues come before
/// warnings so the first entry always explains the status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowReport {
    pub row_number: usize,
    pub status: RowStatus,
    pub issues: Vec<String>,
}

/// Aggregate counts shown at the top of the review step.
///
/// Invariants: `valid_count + warning_count + error_count == total_rows`,
/// and therefore `valid_count + error_count <= total_rows` (warning-only
/// rows are importable but are not counted as `valid_count`). The duplicate
/// lists cover collisions *within the uploaded batch*; collisions with
/// already-registered accounts are reported per row at import time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total_rows: usize,
    pub valid_count: usize,
    pub error_count: usize,
    pub warning_count: usize,
    /// Email addresses appearing more than once in the batch, sorted,
    /// each listed once.
    pub duplicate_emails: Vec<String>,
    /// Student IDs appearing more than once in the batch, sorted,
    /// each listed once.
    pub duplicate_student_ids: Vec<String>,
}

impl RosterSummary {
    /// True when the batch can be imported: nothing blocking and at least
    /// one row to create.
    pub fn is_ready(&self) -> bool {
        self.error_count == 0 && self.total_rows > 0
    }
}

/// Everything the client needs to render the review step and decide
/// whether the import button is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterReport {
    /// Identifier of the pending batch; passed back to start the import.
    pub batch_id: String,
    pub summary: RosterSummary,
    pub rows: Vec<RowReport>,
    /// Mirror of `summary.is_ready()`, serialized for the client.
    pub ready: bool,
}
