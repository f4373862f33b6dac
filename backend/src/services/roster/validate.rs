//! Roster CSV parsing and validation.
//!
//! Turns raw CSV text into `UploadRow`s and classifies every row as
//! valid, error, or warning. Blocking issues (missing required fields,
//! bad role/email/student-ID formats, in-batch duplicates) make a row an
//! error; soft issues (short or missing password, empty department,
//! student without an ID, odd class year) are warnings and never block
//! the import. A row with both kinds is an error: error wins.
//!
//! Duplicate detection here is confined to the uploaded batch. Collisions
//! with accounts already in the database are handled at import time, where
//! they surface as per-row skips.

use common::model::roster::{RowReport, RowStatus, RosterSummary};
use common::model::user::{UploadRow, UserRole};
use rayon::prelude::*;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};

/// Hard cap on data rows per upload. Larger files are rejected outright.
pub const MAX_ROWS: usize = 1000;

pub const MIN_PASSWORD_LEN: usize = 6;

const REQUIRED_COLUMNS: [&str; 4] = ["role", "first_name", "last_name", "email"];
const OPTIONAL_COLUMNS: [&str; 5] = [
    "student_id",
    "department",
    "class_year",
    "phone_number",
    "password",
];

/// Picks the delimiter that occurs most often in the header line.
pub fn detect_delimiter(header_line: &str) -> char {
    [',', ';', '\t', '|']
        .iter()
        .max_by_key(|&&d| header_line.matches(d).count())
        .copied()
        .unwrap_or(',')
}

/// Parses CSV text into upload rows.
///
/// Whole-file failures (empty file, unknown or missing columns, malformed
/// CSV, more than `MAX_ROWS` rows) come back as `Err`; per-row problems are
/// left for `validate` so they can be reported row by row.
pub fn parse_rows(text: &str) -> Result<Vec<UploadRow>, String> {
    let header_line = text.lines().next().ok_or("The file is empty")?;
    let delimiter = detect_delimiter(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers().map_err(|e| e.to_string())?.clone();
    let columns = resolve_columns(&headers)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("Malformed CSV on data row {}: {}", i + 1, e))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(row_from_record(i + 1, &record, &columns));
        if rows.len() > MAX_ROWS {
            return Err(format!(
                "The file has more than {} data rows; split it and upload in parts",
                MAX_ROWS
            ));
        }
    }

    Ok(rows)
}

/// Column name -> position, after checking the header against the known
/// column set.
struct ColumnIndex {
    by_name: HashMap<String, usize>,
}

impl ColumnIndex {
    fn cell<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.by_name
            .get(name)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
    }

    fn optional(&self, record: &csv::StringRecord, name: &str) -> Option<String> {
        let value = self.cell(record, name).trim();
        if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        }
    }
}

fn resolve_columns(headers: &csv::StringRecord) -> Result<ColumnIndex, String> {
    let mut by_name = HashMap::new();
    let mut unknown = Vec::new();

    for (idx, raw) in headers.iter().enumerate() {
        let name = raw.trim().to_ascii_lowercase().replace(' ', "_");
        if name.is_empty() {
            return Err("CSV header cells must not be empty".to_string());
        }
        if !REQUIRED_COLUMNS.contains(&name.as_str()) && !OPTIONAL_COLUMNS.contains(&name.as_str())
        {
            unknown.push(raw.trim().to_string());
            continue;
        }
        if by_name.insert(name.clone(), idx).is_some() {
            return Err(format!("Duplicate column '{}' in header", name));
        }
    }

    if !unknown.is_empty() {
        return Err(format!("Unknown columns: {}", unknown.join(", ")));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !by_name.contains_key(**c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required columns: {}", missing.join(", ")));
    }

    Ok(ColumnIndex { by_name })
}

fn row_from_record(row_number: usize, record: &csv::StringRecord, columns: &ColumnIndex) -> UploadRow {
    UploadRow {
        row_number,
        role: columns.cell(record, "role").trim().to_string(),
        first_name: columns.cell(record, "first_name").trim().to_string(),
        last_name: columns.cell(record, "last_name").trim().to_string(),
        email: columns.cell(record, "email").trim().to_string(),
        student_id: columns.optional(record, "student_id"),
        department: columns.optional(record, "department"),
        class_year: columns.optional(record, "class_year"),
        phone_number: columns.optional(record, "phone_number"),
        password: columns.optional(record, "password"),
    }
}

/// Classifies every row and builds the summary.
///
/// Field-level checks run across rows with rayon; the duplicate scan is a
/// sequential pass over the whole batch afterwards.
pub fn validate(rows: &[UploadRow]) -> Result<(Vec<RowReport>, RosterSummary), String> {
    let email_re =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_err(|e| format!("Regex error: {}", e))?;
    let student_id_re =
        Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").map_err(|e| format!("Regex error: {}", e))?;

    let mut issues: Vec<(Vec<String>, Vec<String>)> = rows
        .par_iter()
        .map(|row| check_row(row, &email_re, &student_id_re))
        .collect();

    let duplicate_emails = mark_duplicates(
        rows,
        &mut issues,
        |row| {
            let email = row.email.trim().to_lowercase();
            (!email.is_empty()).then_some(email)
        },
        "Duplicate email in file",
    );
    let duplicate_student_ids = mark_duplicates(
        rows,
        &mut issues,
        |row| row.student_id.clone(),
        "Duplicate student ID in file",
    );

    let mut reports = Vec::with_capacity(rows.len());
    let mut valid_count = 0;
    let mut error_count = 0;
    let mut warning_count = 0;

    for (row, (errors, warnings)) in rows.iter().zip(issues) {
        let status = if !errors.is_empty() {
            error_count += 1;
            RowStatus::Error
        } else if !warnings.is_empty() {
            warning_count += 1;
            RowStatus::Warning
        } else {
            valid_count += 1;
            RowStatus::Valid
        };

        let mut all = errors;
        all.extend(warnings);
        reports.push(RowReport {
            row_number: row.row_number,
            status,
            issues: all,
        });
    }

    let summary = RosterSummary {
        total_rows: rows.len(),
        valid_count,
        error_count,
        warning_count,
        duplicate_emails,
        duplicate_student_ids,
    };

    Ok((reports, summary))
}

fn check_row(row: &UploadRow, email_re: &Regex, student_id_re: &Regex) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let mut missing = Vec::new();
    if row.role.is_empty() {
        missing.push("role");
    }
    if row.first_name.is_empty() {
        missing.push("first_name");
    }
    if row.last_name.is_empty() {
        missing.push("last_name");
    }
    if row.email.is_empty() {
        missing.push("email");
    }
    if !missing.is_empty() {
        errors.push(format!("Missing required fields: {}", missing.join(", ")));
    }

    let role = UserRole::parse(&row.role);
    if !row.role.is_empty() && role.is_none() {
        errors.push(format!(
            "Unknown role '{}' (expected student or teacher)",
            row.role
        ));
    }

    if !row.email.is_empty() && !email_re.is_match(&row.email) {
        errors.push(format!("Invalid email address '{}'", row.email));
    }

    match &row.student_id {
        Some(id) if !student_id_re.is_match(id) => {
            errors.push(format!("Invalid student ID '{}'", id));
        }
        Some(_) => {}
        None => {
            if role == Some(UserRole::Student) {
                warnings.push("Student row has no student ID".to_string());
            }
        }
    }

    match &row.password {
        Some(pw) if pw.chars().count() < MIN_PASSWORD_LEN => {
            warnings.push(format!(
                "Password is shorter than {} characters",
                MIN_PASSWORD_LEN
            ));
        }
        Some(_) => {}
        None => {
            warnings.push("No password given; a temporary one will be generated".to_string());
        }
    }

    if row.department.is_none() {
        warnings.push("Department is empty".to_string());
    }

    if let Some(year) = &row.class_year {
        if year.len() != 4 || year.chars().any(|c| !c.is_ascii_digit()) {
            warnings.push(format!("Class year '{}' is not a 4-digit year", year));
        }
    }

    (errors, warnings)
}

/// Finds values produced by `key` that occur on more than one row, appends
/// an error to every involved row, and returns the sorted offending values.
fn mark_duplicates(
    rows: &[UploadRow],
    issues: &mut [(Vec<String>, Vec<String>)],
    key: impl Fn(&UploadRow) -> Option<String>,
    message: &str,
) -> Vec<String> {
    let mut occurrences: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(value) = key(row) {
            occurrences.entry(value).or_default().push(idx);
        }
    }

    let mut offending = BTreeSet::new();
    for (value, indices) in occurrences {
        if indices.len() < 2 {
            continue;
        }
        for idx in &indices {
            issues[*idx].0.push(format!("{}: {}", message, value));
        }
        offending.insert(value);
    }

    offending.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "role,first_name,last_name,email,student_id,department,class_year,phone_number,password";

    fn csv_of(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    fn full_row(email: &str, student_id: &str) -> String {
        format!(
            "student,Maria,Lopez,{},{},Mathematics,2026,555-0143,secret-pw",
            email, student_id
        )
    }

    #[test]
    fn delimiter_detection_prefers_most_frequent() {
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a;b;c"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c,d"), '|');
        assert_eq!(detect_delimiter("nodelimiters"), ',');
    }

    #[test]
    fn parses_a_clean_file() {
        let text = csv_of(&[&full_row("maria@example.edu", "S-1")]);
        let rows = parse_rows(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[0].email, "maria@example.edu");
        assert_eq!(rows[0].department.as_deref(), Some("Mathematics"));
    }

    #[test]
    fn parses_semicolon_delimited_files() {
        let text = "role;first_name;last_name;email\nteacher;James;Okafor;j.okafor@example.edu";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "teacher");
        assert_eq!(rows[0].email, "j.okafor@example.edu");
        assert_eq!(rows[0].password, None);
    }

    #[test]
    fn header_matching_ignores_case_and_spaces() {
        let text = "Role,First Name,Last Name,Email\nstudent,Ana,Silva,ana@example.edu";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows[0].first_name, "Ana");
    }

    #[test]
    fn rejects_unknown_columns() {
        let text = "role,first_name,last_name,email,favorite_color\nstudent,A,B,a@b.co,blue";
        let err = parse_rows(text).unwrap_err();
        assert!(err.contains("Unknown columns"), "{}", err);
        assert!(err.contains("favorite_color"), "{}", err);
    }

    #[test]
    fn rejects_missing_required_columns() {
        let text = "first_name,last_name\nAna,Silva";
        let err = parse_rows(text).unwrap_err();
        assert!(err.contains("Missing required columns"), "{}", err);
        assert!(err.contains("role"), "{}", err);
        assert!(err.contains("email"), "{}", err);
    }

    #[test]
    fn rejects_files_over_the_row_cap() {
        let rows: Vec<String> = (0..MAX_ROWS + 1)
            .map(|i| full_row(&format!("u{}@example.edu", i), &format!("S-{}", i)))
            .collect();
        let refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let err = parse_rows(&csv_of(&refs)).unwrap_err();
        assert!(err.contains("more than 1000"), "{}", err);
    }

    #[test]
    fn skips_blank_lines() {
        let text = csv_of(&[&full_row("a@example.edu", "S-1"), "", &full_row("b@example.edu", "S-2")]);
        let rows = parse_rows(&text).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn clean_rows_are_valid_and_ready() {
        let text = csv_of(&[
            &full_row("a@example.edu", "S-1"),
            &full_row("b@example.edu", "S-2"),
        ]);
        let rows = parse_rows(&text).unwrap();
        let (reports, summary) = validate(&rows).unwrap();
        assert!(reports.iter().all(|r| r.status == RowStatus::Valid));
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.valid_count, 2);
        assert_eq!(summary.error_count, 0);
        assert_eq!(summary.warning_count, 0);
        assert!(summary.is_ready());
    }

    #[test]
    fn missing_required_fields_lists_every_field() {
        let text = csv_of(&["student,,,,S-1,Math,2026,,longenough"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, summary) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        assert!(reports[0].issues[0].contains("Missing required fields"));
        assert!(reports[0].issues[0].contains("first_name"));
        assert!(reports[0].issues[0].contains("last_name"));
        assert!(reports[0].issues[0].contains("email"));
        assert!(!reports[0].issues[0].contains("role"));
        assert_eq!(summary.error_count, 1);
        assert!(!summary.is_ready());
    }

    #[test]
    fn unknown_role_is_an_error() {
        let text = csv_of(&["wizard,Ana,Silva,ana@example.edu,,Math,2026,,longenough"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, _) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        assert!(reports[0].issues.iter().any(|i| i.contains("Unknown role 'wizard'")));
    }

    #[test]
    fn malformed_email_is_an_error() {
        let text = csv_of(&["student,Ana,Silva,not-an-email,S-1,Math,2026,,longenough"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, _) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        assert!(reports[0].issues.iter().any(|i| i.contains("Invalid email")));
    }

    #[test]
    fn malformed_student_id_is_an_error() {
        let text = csv_of(&["student,Ana,Silva,ana@example.edu,bad id!,Math,2026,,longenough"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, _) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        assert!(reports[0].issues.iter().any(|i| i.contains("Invalid student ID")));
    }

    #[test]
    fn duplicate_emails_error_every_involved_row() {
        let text = csv_of(&[
            &full_row("same@example.edu", "S-1"),
            &full_row("SAME@example.edu", "S-2"),
            &full_row("other@example.edu", "S-3"),
        ]);
        let rows = parse_rows(&text).unwrap();
        let (reports, summary) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        assert_eq!(reports[1].status, RowStatus::Error);
        assert_eq!(reports[2].status, RowStatus::Valid);
        assert_eq!(summary.duplicate_emails, vec!["same@example.edu".to_string()]);
        assert_eq!(summary.error_count, 2);
        assert_eq!(summary.valid_count, 1);
    }

    #[test]
    fn duplicate_student_ids_are_collected_sorted() {
        let text = csv_of(&[
            &full_row("a@example.edu", "S-2"),
            &full_row("b@example.edu", "S-2"),
            &full_row("c@example.edu", "S-1"),
            &full_row("d@example.edu", "S-1"),
        ]);
        let rows = parse_rows(&text).unwrap();
        let (_, summary) = validate(&rows).unwrap();
        assert_eq!(
            summary.duplicate_student_ids,
            vec!["S-1".to_string(), "S-2".to_string()]
        );
    }

    #[test]
    fn soft_issues_are_warnings_not_blockers() {
        // Short password, no department, student without an ID, odd year.
        let text = csv_of(&["student,Ana,Silva,ana@example.edu,,,20x6,,tiny"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, summary) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Warning);
        assert!(reports[0].issues.iter().any(|i| i.contains("shorter than 6")));
        assert!(reports[0].issues.iter().any(|i| i.contains("Department is empty")));
        assert!(reports[0].issues.iter().any(|i| i.contains("no student ID")));
        assert!(reports[0].issues.iter().any(|i| i.contains("4-digit year")));
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.error_count, 0);
        assert!(summary.is_ready());
    }

    #[test]
    fn missing_password_is_a_warning() {
        let text = csv_of(&["teacher,James,Okafor,j@example.edu,,Physics,,,"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, _) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Warning);
        assert!(reports[0]
            .issues
            .iter()
            .any(|i| i.contains("temporary one will be generated")));
    }

    #[test]
    fn error_takes_precedence_over_warning() {
        // Bad email (error) plus missing department (warning).
        let text = csv_of(&["student,Ana,Silva,broken,S-1,,2026,,longenough"]);
        let rows = parse_rows(&text).unwrap();
        let (reports, summary) = validate(&rows).unwrap();
        assert_eq!(reports[0].status, RowStatus::Error);
        // Blocking issues come first in the list.
        assert!(reports[0].issues[0].contains("Invalid email"));
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.warning_count, 0);
    }

    #[test]
    fn summary_counts_partition_the_batch() {
        let text = csv_of(&[
            &full_row("a@example.edu", "S-1"),                          // valid
            "student,Ana,Silva,ana@example.edu,,,2026,,tiny",           // warnings
            "wizard,Bad,Role,bad@example.edu,S-3,Math,2026,,longenough", // error
        ]);
        let rows = parse_rows(&text).unwrap();
        let (_, summary) = validate(&rows).unwrap();
        assert_eq!(summary.total_rows, 3);
        assert_eq!(
            summary.valid_count + summary.warning_count + summary.error_count,
            summary.total_rows
        );
        assert!(summary.valid_count + summary.error_count <= summary.total_rows);
        assert_eq!(summary.valid_count, 1);
        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.error_count, 1);
    }

    #[test]
    fn empty_file_is_rejected() {
        assert!(parse_rows("").is_err());
    }

    #[test]
    fn header_only_file_is_not_ready() {
        let rows = parse_rows(HEADER).unwrap();
        assert!(rows.is_empty());
        let (_, summary) = validate(&rows).unwrap();
        assert_eq!(summary.total_rows, 0);
        assert!(!summary.is_ready());
    }
}
