use crate::config::AppConfig;
use crate::services::roster::{validate, BatchStore, PendingBatch};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Responder};
use common::model::roster::RosterReport;
use futures_util::StreamExt;
use log::info;
use md5::Context;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Uploads larger than this are rejected while still streaming.
const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// HTTP handler wrapper that converts the internal result to an
/// `HttpResponse`.
///
/// - On success: returns `200 OK` with the `RosterReport` as JSON.
/// - On failure: returns `400 Bad Request` with the error message.
pub async fn process(
    cfg: web::Data<AppConfig>,
    store: web::Data<BatchStore>,
    payload: Multipart,
) -> impl Responder {
    match upload_roster(cfg, store, payload).await {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(e) => HttpResponse::BadRequest().body(format!("Error: {}", e)),
    }
}

/// Receives a roster CSV as multipart form data, validates it, and
/// registers it as a pending batch.
///
/// The uploaded bytes are MD5-hashed while streaming. If a pending batch
/// with the same hash already exists, its report is returned as-is instead
/// of registering a duplicate, so an accidental re-upload of the same file
/// is harmless. Otherwise the file is spooled to
/// `<upload_dir>/<batch_id>_<md5>.csv` and kept until the import succeeds.
async fn upload_roster(
    cfg: web::Data<AppConfig>,
    store: web::Data<BatchStore>,
    mut payload: Multipart,
) -> Result<RosterReport, String> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut md5_hasher = Context::new();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| e.to_string())?;
        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if field_name.as_deref() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        if !filename.ends_with(".csv") {
            return Err("The file must end with .csv".to_string());
        }

        let mut buf = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| e.to_string())?;
            md5_hasher.consume(&chunk);
            buf.extend_from_slice(&chunk);
            if buf.len() > MAX_UPLOAD_BYTES {
                return Err("The file is larger than the 5 MB upload limit".to_string());
            }
        }
        bytes = Some(buf);
    }

    let bytes = bytes.ok_or("Missing file")?;
    let file_md5 = format!("{:x}", md5_hasher.finalize());

    // Same bytes as a batch that is still pending: hand back that report.
    {
        let batches = store.batches.read().await;
        if let Some(existing) = batches.values().find(|b| b.md5 == file_md5) {
            info!("Roster upload matches pending batch {}", existing.report.batch_id);
            return Ok(existing.report.clone());
        }
    }

    let text = String::from_utf8(bytes).map_err(|_| "The file is not valid UTF-8")?;
    let rows = validate::parse_rows(&text)?;
    let (row_reports, summary) = validate::validate(&rows)?;

    let batch_id = Uuid::new_v4().to_string();
    let spool_path = Path::new(&cfg.upload_dir).join(format!("{}_{}.csv", batch_id, file_md5));
    fs::create_dir_all(&cfg.upload_dir).map_err(|e| e.to_string())?;
    fs::write(&spool_path, &text).map_err(|e| e.to_string())?;

    let ready = summary.is_ready();
    let report = RosterReport {
        batch_id: batch_id.clone(),
        summary,
        rows: row_reports,
        ready,
    };

    info!(
        "Roster batch {} uploaded: {} rows, {} errors, {} warnings",
        batch_id, report.summary.total_rows, report.summary.error_count, report.summary.warning_count
    );

    store.batches.write().await.insert(
        batch_id,
        PendingBatch {
            md5: file_md5,
            rows,
            report: report.clone(),
        },
    );

    Ok(report)
}
