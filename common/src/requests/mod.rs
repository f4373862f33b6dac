use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
/// Request payload for the import endpoint.
/// Identifies the validated batch to commit.
pub struct StartImportRequest {
    pub batch_id: String,
}
