/// Token endpoints
///
/// - `POST /api/token/` - Exchange username and password for a token pair
/// - `POST /api/token/refresh/` - Exchange a refresh token for a new access token

use crate::{
    app::AppState,
    body::{required_nonblank, JsonObject},
    error::ApiResult,
};
use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};
use tasktrack_shared::{
    auth::{
        jwt::{self, TokenPair},
        principal::{authenticate_credentials, AuthError},
    },
    store::UserStore,
    validation::FieldErrors,
};
use tracing::info;

/// Token refresh response
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
}

/// Obtain a token pair
///
/// # Endpoint
///
/// ```text
/// POST /api/token/
/// Content-Type: application/json
///
/// { "username": "alice", "password": "StrongP@ssword123" }
/// ```
///
/// # Response
///
/// ```json
/// { "refresh": "eyJ...", "access": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `username` or `password` missing, null or blank
/// - `401 Unauthorized`: unknown user, wrong password or inactive account
pub async fn obtain_token(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<Json<TokenPair>> {
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let username = required_nonblank(&body, "username", &mut errors);
    let password = required_nonblank(&body, "password", &mut errors);
    errors.into_result()?;

    let user = authenticate_credentials(
        state.store.as_ref(),
        username.as_deref().unwrap_or_default(),
        password.as_deref().unwrap_or_default(),
    )
    .await?;

    state.store.record_login(user.id).await?;

    let pair = jwt::issue_pair(user.id, state.jwt_secret(), &state.config.token_lifetimes())?;

    info!(user_id = %user.id, username = %user.username, "Issued token pair");

    Ok(Json(pair))
}

/// Refresh an access token
///
/// # Endpoint
///
/// ```text
/// POST /api/token/refresh/
/// Content-Type: application/json
///
/// { "refresh": "eyJ..." }
/// ```
///
/// # Response
///
/// ```json
/// { "access": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: `refresh` missing, null or blank
/// - `401 Unauthorized`: invalid or expired token, or the user is gone or inactive
pub async fn refresh_token(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<Json<TokenRefreshResponse>> {
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let refresh = required_nonblank(&body, "refresh", &mut errors);
    errors.into_result()?;

    let claims =
        jwt::validate_refresh_token(refresh.as_deref().unwrap_or_default(), state.jwt_secret())?;

    let user = state
        .store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;
    if !user.is_active {
        return Err(AuthError::InactiveUser.into());
    }

    let access = jwt::access_token_for(&claims, state.jwt_secret(), &state.config.token_lifetimes())?;

    Ok(Json(TokenRefreshResponse { access }))
}
