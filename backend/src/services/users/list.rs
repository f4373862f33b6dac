use crate::config::AppConfig;
use crate::db;
use actix_web::{web, HttpResponse, Responder};
use common::model::user::PaginatedUsers;
use serde::Deserialize;

const KNOWN_ROLES: [&str; 3] = ["admin", "teacher", "student"];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<String>,
}

impl ListQuery {
    /// Page number, defaulting to 1.
    fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size, defaulting to 10 and clamped to 1-100.
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 100)
    }
}

pub async fn process(cfg: web::Data<AppConfig>, query: web::Query<ListQuery>) -> impl Responder {
    if let Some(role) = &query.role {
        if !KNOWN_ROLES.contains(&role.as_str()) {
            return HttpResponse::BadRequest()
                .body(format!("Unknown role filter '{}'", role));
        }
    }

    match list_users(&cfg, &query) {
        Ok(page) => HttpResponse::Ok().json(page),
        Err(e) => {
            HttpResponse::ServiceUnavailable().body(format!("Error listing users: {}", e))
        }
    }
}

fn list_users(cfg: &AppConfig, query: &ListQuery) -> Result<PaginatedUsers, String> {
    let conn = db::open(&cfg.database_path)?;
    db::list_users(&conn, query.page(), query.limit(), query.role.as_deref())
}
