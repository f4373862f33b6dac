//! # Import Job Start Service
//!
//! Provides `POST /api/v1/roster/import`, which commits a previously
//! uploaded, error-free batch by creating one account per row. The work
//! runs as a background job so the client can poll a progress percentage.
//!
//! ## Workflow:
//!
//! 1. **HTTP Request**: The `process` handler receives a
//!    `StartImportRequest` containing a `batch_id`.
//!
//! 2. **Gate**: The batch must exist in the pending store and its report
//!    must be error-free. The server re-checks this even though the client
//!    disables its upload button on errors.
//!
//! 3. **Job Scheduling**: `schedule_import_job` registers a fresh `job_id`
//!    as `Pending`, returns it immediately, and spawns a Tokio task to
//!    manage the job's lifecycle.
//!
//! 4. **Background Processing**: The spawned task runs `import_blocking`
//!    via `tokio::task::spawn_blocking`, keeping the synchronous SQLite
//!    work off the async runtime. A per-job channel carries row
//!    completions, which a listener task translates into
//!    `InProgress(percent)` updates for the central job controller.
//!
//! 5. **Commit semantics**: All inserts happen in one transaction. Rows
//!    whose email or student ID is already registered (in the database or
//!    earlier in the same batch run) are skipped and recorded as
//!    `RowError`s; only infrastructure failures roll back and fail the
//!    job. On success the batch leaves the pending store, its spooled file
//!    is removed, and `Completed` carries the `ImportOutcome` as JSON.

use crate::config::AppConfig;
use crate::db;
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::services::roster::BatchStore;
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::model::import::{ImportOutcome, RowError};
use common::model::user::{UploadRow, UserRole};
use common::requests::StartImportRequest;
use log::info;
use std::fs;
use std::path::Path;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Progress message from the blocking worker to the async listener.
#[derive(Debug)]
enum ImportUpdate {
    /// Overall job status change (e.g. an early failure).
    Job(JobStatus),
    /// One row finished; used to compute the percentage.
    Row { row_index: usize, total_rows: usize },
}

/// The Actix web handler for `POST /api/v1/roster/import`.
///
/// Returns `200 OK` with `{"job_id": ...}` once the job is scheduled, or
/// `400 Bad Request` when the batch is unknown or still has errors.
pub(crate) async fn process(
    state: web::Data<JobsState>,
    store: web::Data<BatchStore>,
    cfg: web::Data<AppConfig>,
    payload: web::Json<StartImportRequest>,
) -> impl Responder {
    match schedule_import_job(state, store, cfg, payload.into_inner()).await {
        Ok(job_id) => HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id })),
        Err(err) => HttpResponse::BadRequest().body(err),
    }
}

async fn schedule_import_job(
    state: web::Data<JobsState>,
    store: web::Data<BatchStore>,
    cfg: web::Data<AppConfig>,
    req: StartImportRequest,
) -> Result<String, String> {
    // Snapshot the batch under the read lock; the worker owns the copy.
    let (rows, file_md5) = {
        let batches = store.batches.read().await;
        let batch = batches
            .get(&req.batch_id)
            .ok_or("Unknown batch id; upload the file first")?;
        if !batch.report.ready {
            return Err("The batch has validation errors; fix the file and upload it again".to_string());
        }
        (batch.rows.clone(), batch.md5.clone())
    };

    let job_id = Uuid::new_v4().to_string();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);

    let tx = state.tx.clone();
    let job_id_clone = job_id.clone();
    let batch_id = req.batch_id;
    let store = store.into_inner();
    let db_path = cfg.database_path.clone();
    let upload_dir = cfg.upload_dir.clone();

    tokio::spawn(async move {
        // Dedicated channel for this job's row-level progress.
        let (import_tx, mut import_rx) = mpsc::channel::<ImportUpdate>(100);

        // Listener: translate worker updates into central JobUpdates.
        let job_updater_tx = tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        tokio::spawn(async move {
            while let Some(update) = import_rx.recv().await {
                let status = match update {
                    ImportUpdate::Job(job_status) => job_status,
                    ImportUpdate::Row {
                        row_index,
                        total_rows,
                    } => {
                        let progress = if total_rows > 0 {
                            ((row_index + 1) as f32 / total_rows as f32 * 100.0) as u32
                        } else {
                            0
                        };
                        JobStatus::InProgress(progress)
                    }
                };

                let _ = job_updater_tx
                    .send(JobUpdate::new(job_id_for_updater.clone(), status))
                    .await;
            }
        });

        let handle =
            tokio::task::spawn_blocking(move || import_blocking(import_tx, &rows, &db_path));

        match handle.await {
            Ok(Ok(outcome)) => {
                info!(
                    "Import job {} finished: {} created, {} skipped",
                    job_id_clone, outcome.created, outcome.skipped
                );
                // The batch is done; drop it and its spooled file.
                store.batches.write().await.remove(&batch_id);
                let spool = Path::new(&upload_dir).join(format!("{}_{}.csv", batch_id, file_md5));
                let _ = fs::remove_file(spool);

                let status = match serde_json::to_string(&outcome) {
                    Ok(json) => JobStatus::Completed(json),
                    Err(e) => JobStatus::Failed(format!("Outcome serialization error: {}", e)),
                };
                let _ = tx.send(JobUpdate::new(job_id_clone, status)).await;
            }
            Ok(Err(e)) => {
                let _ = tx
                    .send(JobUpdate::new(job_id_clone, JobStatus::Failed(e)))
                    .await;
            }
            Err(e) => {
                let _ = tx
                    .send(JobUpdate::new(
                        job_id_clone,
                        JobStatus::Failed(format!("Task join error: {}", e)),
                    ))
                    .await;
            }
        }
    });

    Ok(job_id)
}

/// The synchronous import, designed to run via `spawn_blocking`.
///
/// Inserts every importable row inside a single transaction and reports
/// progress after each row. Returns the final `ImportOutcome`; a database
/// error aborts (and rolls back) the whole batch.
fn import_blocking(
    tx: mpsc::Sender<ImportUpdate>,
    rows: &[UploadRow],
    db_path: &str,
) -> Result<ImportOutcome, String> {
    let _ = tx.blocking_send(ImportUpdate::Job(JobStatus::InProgress(0)));

    let mut conn = db::open(db_path)?;
    let mut emails = db::existing_emails(&conn)?;
    let mut student_ids = db::existing_student_ids(&conn)?;

    let db_tx = conn.transaction().map_err(|e| e.to_string())?;

    let total_rows = rows.len();
    let mut created: u32 = 0;
    let mut skipped: u32 = 0;
    let mut row_errors = Vec::new();

    for (i, row) in rows.iter().enumerate() {
        let email_key = row.email.trim().to_lowercase();

        if emails.contains(&email_key) {
            skipped += 1;
            row_errors.push(RowError {
                row_number: row.row_number,
                message: format!("Email {} is already registered", row.email.trim()),
            });
        } else if row
            .student_id
            .as_ref()
            .is_some_and(|id| student_ids.contains(id))
        {
            skipped += 1;
            row_errors.push(RowError {
                row_number: row.row_number,
                message: format!(
                    "Student ID {} is already registered",
                    row.student_id.as_deref().unwrap_or("")
                ),
            });
        } else {
            match UserRole::parse(&row.role) {
                Some(role) => {
                    let password = row
                        .password
                        .clone()
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(db::generate_password);
                    db::insert_user(&db_tx, row, role, &db::hash_password(&password))?;
                    created += 1;
                    emails.insert(email_key);
                    if let Some(id) = &row.student_id {
                        student_ids.insert(id.clone());
                    }
                }
                None => {
                    // Validation gates this out; kept as a skip in case a
                    // stale batch ever reaches the worker.
                    skipped += 1;
                    row_errors.push(RowError {
                        row_number: row.row_number,
                        message: format!("Role '{}' cannot be imported", row.role),
                    });
                }
            }
        }

        let _ = tx.blocking_send(ImportUpdate::Row {
            row_index: i,
            total_rows,
        });
    }

    db_tx.commit().map_err(|e| e.to_string())?;

    Ok(ImportOutcome {
        created,
        skipped,
        row_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::roster::validate;

    fn parse(text: &str) -> Vec<UploadRow> {
        validate::parse_rows(text).unwrap()
    }

    fn test_db(dir: &tempfile::TempDir) -> String {
        let path = dir.path().join("import.db").to_string_lossy().to_string();
        let conn = db::open(&path).unwrap();
        db::init_schema(&conn).unwrap();
        path
    }

    #[test]
    fn imports_a_clean_batch() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = test_db(&dir);
        let rows = parse(
            "role,first_name,last_name,email,student_id,password\n\
             student,Maria,Lopez,maria@example.edu,S-1,secret-pw\n\
             teacher,James,Okafor,james@example.edu,,chalkdust",
        );

        let (tx, mut rx) = mpsc::channel(100);
        let outcome = import_blocking(tx, &rows, &db_path).unwrap();
        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.skipped, 0);
        assert!(outcome.row_errors.is_empty());

        let conn = db::open(&db_path).unwrap();
        let emails = db::existing_emails(&conn).unwrap();
        assert!(emails.contains("maria@example.edu"));
        assert!(emails.contains("james@example.edu"));

        // First message announces the job, then one per row.
        let mut row_updates = 0;
        while let Ok(update) = rx.try_recv() {
            if matches!(update, ImportUpdate::Row { .. }) {
                row_updates += 1;
            }
        }
        assert_eq!(row_updates, 2);
    }

    #[test]
    fn already_registered_rows_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = test_db(&dir);
        let conn = db::open(&db_path).unwrap();
        db::ensure_admin_user(&conn, "taken@example.edu", "pw").unwrap();

        let rows = parse(
            "role,first_name,last_name,email,student_id\n\
             student,A,One,TAKEN@example.edu,S-1\n\
             student,B,Two,fresh@example.edu,S-2",
        );

        let (tx, _rx) = mpsc::channel(100);
        let outcome = import_blocking(tx, &rows, &db_path).unwrap();
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.row_errors.len(), 1);
        assert_eq!(outcome.row_errors[0].row_number, 1);
        assert!(outcome.row_errors[0].message.contains("already registered"));
    }

    #[test]
    fn duplicate_student_id_against_db_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = test_db(&dir);

        let first = parse(
            "role,first_name,last_name,email,student_id\n\
             student,A,One,a@example.edu,S-1",
        );
        let (tx, _rx) = mpsc::channel(100);
        import_blocking(tx, &first, &db_path).unwrap();

        let second = parse(
            "role,first_name,last_name,email,student_id\n\
             student,B,Two,b@example.edu,S-1",
        );
        let (tx, _rx) = mpsc::channel(100);
        let outcome = import_blocking(tx, &second, &db_path).unwrap();
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.row_errors[0].message.contains("Student ID S-1"));
    }

    #[test]
    fn generates_passwords_for_rows_without_one() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = test_db(&dir);
        let rows = parse(
            "role,first_name,last_name,email\n\
             teacher,No,Password,nopw@example.edu",
        );

        let (tx, _rx) = mpsc::channel(100);
        let outcome = import_blocking(tx, &rows, &db_path).unwrap();
        assert_eq!(outcome.created, 1);

        let conn = db::open(&db_path).unwrap();
        let hashed: String = conn
            .query_row(
                "SELECT hashed_password FROM users WHERE email = 'nopw@example.edu'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(hashed.starts_with("md5$"));
    }

    #[test]
    fn progress_percentages_reach_one_hundred() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = test_db(&dir);
        let mut text = String::from("role,first_name,last_name,email,student_id\n");
        for i in 0..4 {
            text.push_str(&format!("student,R,{},r{}@example.edu,S-{}\n", i, i, i));
        }
        let rows = parse(&text);

        let (tx, mut rx) = mpsc::channel(100);
        import_blocking(tx, &rows, &db_path).unwrap();

        let mut last_percent = 0;
        while let Ok(update) = rx.try_recv() {
            if let ImportUpdate::Row {
                row_index,
                total_rows,
            } = update
            {
                last_percent = ((row_index + 1) as f32 / total_rows as f32 * 100.0) as u32;
            }
        }
        assert_eq!(last_percent, 100);
    }
}
