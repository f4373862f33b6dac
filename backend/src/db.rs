//! SQLite persistence for user accounts.
//!
//! One `users` table holds every account: the bootstrapped admin, plus the
//! students and teachers created through bulk imports. Emails are unique
//! case-insensitively; student IDs are unique when present (SQLite permits
//! any number of NULLs under a UNIQUE constraint).

use common::model::user::{PageMeta, PaginatedUsers, UploadRow, UserRecord, UserRole};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use uuid::Uuid;

pub fn open(path: &str) -> Result<Connection, String> {
    Connection::open(path).map_err(|e| e.to_string())
}

pub fn init_schema(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE COLLATE NOCASE,
            hashed_password TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            last_active TEXT,
            student_id TEXT UNIQUE,
            department TEXT,
            class_year TEXT,
            phone_number TEXT
        );
        CREATE INDEX IF NOT EXISTS ix_users_role ON users (role);",
    )
    .map_err(|e| e.to_string())
}

/// Creates the configured admin account if it does not exist yet.
/// Returns `true` when a new account was inserted.
pub fn ensure_admin_user(conn: &Connection, email: &str, password: &str) -> Result<bool, String> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| e.to_string())?;

    if existing.is_some() {
        return Ok(false);
    }

    conn.execute(
        "INSERT INTO users (email, hashed_password, first_name, last_name, role, is_active)
         VALUES (?1, ?2, 'Admin', 'User', 'admin', 1)",
        params![email, hash_password(password)],
    )
    .map_err(|e| e.to_string())?;

    Ok(true)
}

/// Salted digest in the form `md5$<salt>$<hex>`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = md5::compute(format!("{}{}", salt, password).as_bytes());
    format!("md5${}${:x}", salt, digest)
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("md5"), Some(salt), Some(hex)) => {
            let digest = md5::compute(format!("{}{}", salt, password).as_bytes());
            format!("{:x}", digest) == hex
        }
        _ => false,
    }
}

/// Random temporary password for rows that did not supply one.
pub fn generate_password() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

pub fn insert_user(
    conn: &Connection,
    row: &UploadRow,
    role: UserRole,
    hashed_password: &str,
) -> Result<(), String> {
    conn.execute(
        "INSERT INTO users (email, hashed_password, first_name, last_name, role, is_active,
                            student_id, department, class_year, phone_number)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7, ?8, ?9)",
        params![
            row.email.trim(),
            hashed_password,
            row.first_name.trim(),
            row.last_name.trim(),
            role.as_str(),
            row.student_id,
            row.department,
            row.class_year,
            row.phone_number,
        ],
    )
    .map_err(|e| e.to_string())?;
    Ok(())
}

/// All registered emails, lowercased for case-insensitive comparison.
pub fn existing_emails(conn: &Connection) -> Result<HashSet<String>, String> {
    let mut stmt = conn
        .prepare("SELECT email FROM users")
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| e.to_string())?;
    Ok(rows
        .filter_map(Result::ok)
        .map(|e| e.to_lowercase())
        .collect())
}

pub fn existing_student_ids(conn: &Connection) -> Result<HashSet<String>, String> {
    let mut stmt = conn
        .prepare("SELECT student_id FROM users WHERE student_id IS NOT NULL")
        .map_err(|e| e.to_string())?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| e.to_string())?;
    Ok(rows.filter_map(Result::ok).collect())
}

/// Paginated slice of the users table, newest first, optionally filtered
/// by role.
pub fn list_users(
    conn: &Connection,
    page: i64,
    limit: i64,
    role: Option<&str>,
) -> Result<PaginatedUsers, String> {
    let offset = (page - 1) * limit;

    let total: i64 = match role {
        Some(role) => conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = ?1",
                params![role],
                |row| row.get(0),
            )
            .map_err(|e| e.to_string())?,
        None => conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(|e| e.to_string())?,
    };

    let select = "SELECT id, email, first_name, last_name, role, is_active, created_at,
                         student_id, department, class_year, phone_number
                  FROM users";

    fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
        Ok(UserRecord {
            id: row.get(0)?,
            email: row.get(1)?,
            first_name: row.get(2)?,
            last_name: row.get(3)?,
            role: row.get(4)?,
            is_active: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            student_id: row.get(7)?,
            department: row.get(8)?,
            class_year: row.get(9)?,
            phone_number: row.get(10)?,
        })
    }

    let data: Vec<UserRecord> = match role {
        Some(role) => {
            let mut stmt = conn
                .prepare(&format!(
                    "{} WHERE role = ?1 ORDER BY id DESC LIMIT ?2 OFFSET ?3",
                    select
                ))
                .map_err(|e| e.to_string())?;
            let rows = stmt
                .query_map(params![role, limit, offset], map_row)
                .map_err(|e| e.to_string())?;
            rows.filter_map(Result::ok).collect()
        }
        None => {
            let mut stmt = conn
                .prepare(&format!("{} ORDER BY id DESC LIMIT ?1 OFFSET ?2", select))
                .map_err(|e| e.to_string())?;
            let rows = stmt
                .query_map(params![limit, offset], map_row)
                .map_err(|e| e.to_string())?;
            rows.filter_map(Result::ok).collect()
        }
    };

    let total_pages = if total == 0 { 0 } else { (total + limit - 1) / limit };
    Ok(PaginatedUsers {
        data,
        meta: PageMeta {
            page,
            limit,
            total,
            total_pages,
        },
    })
}
