/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Token obtain and refresh
/// - `tasks`: Task CRUD, toggle and listing
/// - `users`: Registration, profiles and user listing

pub mod auth;
pub mod health;
pub mod tasks;
pub mod users;

use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Parses an `:id` path segment; anything that is not a UUID cannot exist
pub(crate) fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found())
}
