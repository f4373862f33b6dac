use serde::{Deserialize, Serialize};

/// The account role a CSV row is allowed to request.
///
/// The platform also has an `admin` role, but admin accounts are created at
/// startup from configuration, never through a bulk upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Teacher,
}

impl UserRole {
    /// Parses a CSV cell into a role. Case-insensitive, surrounding
    /// whitespace ignored.
    pub fn parse(value: &str) -> Option<UserRole> {
        match value.trim().to_ascii_lowercase().as_str() {
            "student" => Some(UserRole::Student),
            "teacher" => Some(UserRole::Teacher),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
        }
    }
}

/// One data row parsed out of an uploaded roster CSV.
///
/// `row_number` is 1-based and counts data rows only (the header is row 0
/// from the file's point of view and is never reported).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRow {
    pub row_number: usize,
    /// Raw role cell. Kept as text so rows with an unrecognized role can
    /// still be reported instead of being dropped at parse time.
    pub role: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub class_year: Option<String>,
    pub phone_number: Option<String>,
    pub password: Option<String>,
}

/// A persisted user account, as returned by the listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub is_active: bool,
    pub created_at: String,
    pub student_id: Option<String>,
    pub department: Option<String>,
    pub class_year: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedUsers {
    pub data: Vec<UserRecord>,
    pub meta: PageMeta,
}
