mod config;
mod db;
mod job_controller;
mod services;

use crate::config::AppConfig;
use crate::job_controller::state::JobsState;
use crate::services::roster::BatchStore;
use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use env_logger::Env;
use log::{error, info};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

async fn index() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "service": "roster backend",
        "version": env!("CARGO_PKG_VERSION"),
        "health": "/health",
    }))
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "healthy" }))
}

/// Prepares everything the server needs before it binds: the spool
/// directory, the database schema, and the admin account.
fn bootstrap(cfg: &AppConfig) -> Result<(), String> {
    std::fs::create_dir_all(&cfg.upload_dir).map_err(|e| e.to_string())?;

    let conn = db::open(&cfg.database_path)?;
    db::init_schema(&conn)?;
    if db::ensure_admin_user(&conn, &cfg.admin_email, &cfg.admin_password)? {
        info!("Admin user created: {}", cfg.admin_email);
    } else {
        info!("Admin user already exists");
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let cfg = AppConfig::from_env();

    if let Err(e) = bootstrap(&cfg) {
        error!("Startup failed: {}", e);
        return Err(std::io::Error::other(e));
    }

    // Initialize job controller state
    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState {
        jobs: Arc::new(RwLock::new(HashMap::new())),
        tx,
    };

    // Start job updater task
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let batch_store = BatchStore::default();

    let bind_addr = (cfg.host.clone(), cfg.port);
    info!("Server running at http://{}:{}", cfg.host, cfg.port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::JsonConfig::default().limit(10 * 1024 * 1024)) // 10 MB
            .app_data(web::Data::new(cfg.clone()))
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(web::Data::new(batch_store.clone()))
            .service(services::roster::configure_routes())
            .service(services::users::configure_routes())
            .route("/", web::get().to(index))
            .route("/health", web::get().to(health))
    })
    .bind(bind_addr)?
    .run()
    .await
}
