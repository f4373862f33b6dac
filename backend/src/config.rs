//! Runtime configuration, read from the environment at startup.
//!
//! Every knob has a development default so the server runs with no
//! environment at all. `ROSTER_ADMIN_EMAIL` / `ROSTER_ADMIN_PASSWORD`
//! control the account bootstrapped on first start and should be set in
//! any real deployment.

use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DB: &str = "quizapp.db";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_ADMIN_EMAIL: &str = "admin@macquiz.com";
const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    /// Directory where uploaded roster files are spooled before import.
    pub upload_dir: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        AppConfig {
            host: var_or("ROSTER_HOST", DEFAULT_HOST),
            // A non-numeric port falls back to the default instead of
            // aborting startup.
            port: env::var("ROSTER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_path: var_or("ROSTER_DB", DEFAULT_DB),
            upload_dir: var_or("ROSTER_UPLOAD_DIR", DEFAULT_UPLOAD_DIR),
            admin_email: var_or("ROSTER_ADMIN_EMAIL", DEFAULT_ADMIN_EMAIL),
            admin_password: var_or("ROSTER_ADMIN_PASSWORD", DEFAULT_ADMIN_PASSWORD),
        }
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
