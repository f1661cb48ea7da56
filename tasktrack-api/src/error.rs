/// Error handling for the API server
///
/// Handlers return `ApiResult<T>`; every error maps to one HTTP status and a
/// JSON body.
///
/// - Validation failures (400) are returned as a field-to-messages object,
///   e.g. `{"description": ["This field may not be blank."]}`.
/// - Everything else is returned as `{"error": "<code>", "message": "<text>"}`.
///
/// A task that exists but belongs to someone else produces exactly the same
/// 404 response as a task that does not exist.
///
/// # Example
///
/// ```
/// use tasktrack_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::json;
///
/// async fn handler(found: bool) -> ApiResult<Json<serde_json::Value>> {
///     if !found {
///         return Err(ApiError::not_found());
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use tasktrack_shared::{
    auth::{
        authorization::{Action, AuthzError},
        jwt::JwtError,
        password::PasswordError,
        principal::AuthError,
    },
    filter::INVALID_REGEX,
    store::StoreError,
    validation::FieldErrors,
};

/// Body of every 404
pub const NOT_FOUND: &str = "Not found.";

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";

pub const INVALID_CREDENTIALS: &str = "No active account found with the given credentials";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Malformed request (400)
    BadRequest(String),

    /// Per-field validation failures (400)
    Validation(FieldErrors),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Internal server error (500)
    InternalError(String),
}

impl ApiError {
    /// The 404 used for missing and for masked objects alike
    pub fn not_found() -> Self {
        ApiError::NotFound(NOT_FOUND.to_string())
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Validation(errors) => write!(f, "Validation failed: {}", errors),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::Validation(errors) => {
                return (StatusCode::BAD_REQUEST, Json(errors)).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { field } => ApiError::Validation(FieldErrors::single(
                field,
                format!("A user with that {field} already exists."),
            )),
            StoreError::InvalidPattern(msg) => {
                tracing::debug!(error = %msg, "Store rejected description pattern");
                ApiError::Validation(FieldErrors::single("description__regex", INVALID_REGEX))
            }
            StoreError::Integrity(msg) => {
                ApiError::InternalError(format!("Integrity violation: {}", msg))
            }
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized(NOT_AUTHENTICATED.to_string()),
            AuthError::InvalidFormat => {
                ApiError::Unauthorized("Invalid Authorization header.".to_string())
            }
            AuthError::InvalidToken(_) => {
                ApiError::Unauthorized("Given token not valid for any token type".to_string())
            }
            AuthError::UnknownUser => ApiError::Unauthorized("User not found".to_string()),
            AuthError::InactiveUser => ApiError::Unauthorized("User is inactive".to_string()),
            AuthError::InvalidCredentials => {
                ApiError::Unauthorized(INVALID_CREDENTIALS.to_string())
            }
            AuthError::Password(err) => err.into(),
            AuthError::Store(err) => err.into(),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::NotFound => ApiError::not_found(),
            AuthzError::Forbidden { action } => {
                let verb = match action {
                    Action::Read => "access",
                    other => other.verb(),
                };
                ApiError::Forbidden(format!("You do not have permission to {verb} this profile."))
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Only refresh tokens reach this path; access tokens go through [`AuthError`]
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ApiError::InternalError(msg),
            _ => ApiError::Unauthorized("Token is invalid or expired".to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}
