//! # Users Service Module
//!
//! Read side of the user administration screens: the paginated account
//! listing the dashboard shows underneath the bulk import. Account
//! creation happens through the roster import, not here.
//!
//! ## Sub-modules:
//! - `list`: Handles the paginated, role-filterable listing of accounts.

mod list;

use actix_web::web::{get, scope};
use actix_web::Scope;

/// The base path for all user-related API endpoints.
const API_PATH: &str = "/api/v1/users";

/// Configures and returns the Actix `Scope` for user routes.
///
/// # Registered Routes:
///
/// *   **`GET /api/v1/users`**:
///     - **Handler**: `list::process`
///     - **Description**: Returns a page of accounts, newest first.
///       Supports `page` (min 1), `limit` (1-100, default 10), and an
///       optional exact `role` filter (`admin`, `teacher`, `student`).
pub fn configure_routes() -> Scope {
    scope(API_PATH).route("", get().to(list::process))
}
