/// User endpoints
///
/// # Endpoints
///
/// - `POST /api/users/register/` - Public registration
/// - `GET /api/users/` - List visible users (filterable by `username`, `email`)
/// - `GET /api/users/profiles/:id/` - Retrieve a profile
/// - `PUT /api/users/profiles/:id/` - Replace profile fields (`password` required)
/// - `PATCH /api/users/profiles/:id/` - Update some profile fields
/// - `DELETE /api/users/profiles/:id/` - Delete an account and its tasks
///
/// # Access rules
///
/// - Staff may act on any profile; everyone else only on their own. Denials
///   are `403 Forbidden`.
/// - Staff and superusers list every user; everyone else lists only
///   themselves.
/// - Profile updates can change `email`, `first_name`, `last_name` and
///   `password` only. Any other field in the body, role flags included, is
///   ignored.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use tasktrack_shared::{
    audit::{AuditAction, AuditEvent},
    auth::{
        authorization::{authorize_profile, user_list_scope, Action},
        password::{hash_password, validate_password, PasswordContext},
        principal::Principal,
    },
    filter::{user::UserFilter, QueryParams},
    models::user::{CreateUser, UpdateUser, User, UserProfile, UserScope},
    store::{PageRequest, UserStore},
    validation::{FieldErrors, BLANK},
};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::parse_id;
use crate::{
    app::AppState,
    body::{optional_text, required_text, JsonObject},
    error::{ApiError, ApiResult},
    pagination::{page_request, paginate, PageLinks, Paginated},
};

pub const USERNAME_MAX_LENGTH: usize = 150;

pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

const TOO_LONG: &str = "Ensure this field has no more than 150 characters.";

/// Email and names, shared by registration and profile updates
#[derive(Debug, Default, Validate)]
pub struct ProfileFields {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: Option<String>,
}

impl ProfileFields {
    /// Reads and validates the fields present in `body`
    ///
    /// The email is trimmed, and an empty email is allowed: it clears the
    /// address.
    fn read(body: &JsonObject, errors: &mut FieldErrors) -> Self {
        let fields = Self {
            email: optional_text(body, "email", errors).map(|e| e.trim().to_string()),
            first_name: optional_text(body, "first_name", errors),
            last_name: optional_text(body, "last_name", errors),
        };
        fields.check(errors);
        fields
    }

    fn check(&self, errors: &mut FieldErrors) {
        if let Err(invalid) = self.validate() {
            let mut invalid = FieldErrors::from(invalid);
            // the email validator rejects ""
            if self.email.as_deref() == Some("") {
                invalid.remove("email");
            }
            errors.merge(invalid);
        }
    }
}

/// Trims and checks a username that was read from the body
fn validate_username(errors: &mut FieldErrors, username: Option<String>) -> Option<String> {
    let username = username?;
    let username = username.trim();
    if username.is_empty() {
        errors.add("username", BLANK);
        return None;
    }

    if username.chars().count() > USERNAME_MAX_LENGTH {
        errors.add("username", TOO_LONG);
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-'))
    {
        errors.add("username", INVALID_USERNAME);
    }
    Some(username.to_string())
}

/// Checks a new password; `None` when absent or blank
fn validate_new_password(
    errors: &mut FieldErrors,
    password: Option<String>,
    context: &PasswordContext<'_>,
) -> Option<String> {
    let password = password?;
    if password.is_empty() {
        errors.add("password", BLANK);
        return None;
    }
    errors.extend_field("password", validate_password(&password, context));
    Some(password)
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/users/register/
/// Content-Type: application/json
///
/// {
///   "username": "newuser",
///   "email": "newuser@example.com",
///   "first_name": "New",
///   "last_name": "User",
///   "password": "StrongP@ssword123"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the public profile; the password is never returned.
///
/// `is_active`, `is_staff` and `is_superuser` are not accepted: new accounts
/// are always active and unprivileged.
///
/// # Errors
///
/// - `400 Bad Request`: every invalid field, keyed by name
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let username = required_text(&body, "username", &mut errors);
    let username = validate_username(&mut errors, username);
    let profile = ProfileFields::read(&body, &mut errors);

    if let Some(username) = &username {
        if !errors.contains("username")
            && state.store.find_user_by_username(username).await?.is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }
    }

    let context = PasswordContext {
        username: username.as_deref().unwrap_or_default(),
        first_name: profile.first_name.as_deref().unwrap_or_default(),
        last_name: profile.last_name.as_deref().unwrap_or_default(),
        email: profile.email.as_deref().unwrap_or_default(),
    };
    let password = required_text(&body, "password", &mut errors);
    let password = validate_new_password(&mut errors, password, &context);

    errors.into_result()?;
    let (Some(username), Some(password)) = (username, password) else {
        return Err(ApiError::InternalError(
            "Registration passed validation without username or password".to_string(),
        ));
    };

    let user = state
        .store
        .create_user(CreateUser {
            username,
            email: profile.email.unwrap_or_default(),
            password_hash: hash_password(&password)?,
            first_name: profile.first_name.unwrap_or_default(),
            last_name: profile.last_name.unwrap_or_default(),
            is_staff: false,
            is_superuser: false,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "User created");
    let actor = Principal::from(&user);
    state.record(AuditEvent::new(&actor, AuditAction::UserRegistered, user.id));

    Ok((StatusCode::CREATED, Json(UserProfile::from(&user))))
}

/// Retrieve a profile
///
/// Permission is checked before the lookup: a non-staff user asking for any
/// other id gets `403`, whether or not that user exists.
///
/// # Errors
///
/// - `403 Forbidden`: not staff and not the profile owner
/// - `404 Not Found`: no such user (staff and self only)
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let target = Uuid::parse_str(&raw_id).ok();

    if let Err(denied) = authorize_profile(&principal, target.unwrap_or(Uuid::nil()), Action::Read)
    {
        warn!(
            user_id = %principal.id,
            username = %principal.username,
            target = %raw_id,
            "Attempted to access another user's profile"
        );
        return Err(denied.into());
    }

    let id = target.ok_or_else(ApiError::not_found)?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    info!(user_id = %principal.id, target = %id, "Retrieved profile");

    Ok(Json(UserProfile::from(&user)))
}

/// Replace profile fields; `password` is required
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields
/// - `403 Forbidden`: not staff and not the profile owner
/// - `404 Not Found`: no such user
pub async fn replace_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    update_profile(state, principal, raw_id, payload, false).await
}

/// Update some profile fields
///
/// # Errors
///
/// - `400 Bad Request`: invalid fields
/// - `403 Forbidden`: not staff and not the profile owner
/// - `404 Not Found`: no such user
pub async fn patch_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<Json<UserProfile>> {
    update_profile(state, principal, raw_id, payload, true).await
}

/// Looks the target up (404), then checks permission (403)
async fn profile_target(
    state: &AppState,
    principal: &Principal,
    raw_id: &str,
    action: Action,
) -> ApiResult<User> {
    let id = parse_id(raw_id)?;
    let user = state
        .store
        .find_user(id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if let Err(denied) = authorize_profile(principal, user.id, action) {
        warn!(
            user_id = %principal.id,
            username = %principal.username,
            target = %user.id,
            "Attempted to {} another user's profile",
            action.verb()
        );
        return Err(denied.into());
    }
    Ok(user)
}

async fn update_profile(
    state: AppState,
    principal: Principal,
    raw_id: String,
    payload: Result<Json<JsonObject>, JsonRejection>,
    partial: bool,
) -> ApiResult<Json<UserProfile>> {
    let target = profile_target(&state, &principal, &raw_id, Action::Update).await?;
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let profile = ProfileFields::read(&body, &mut errors);
    let context = PasswordContext {
        username: &target.username,
        first_name: profile.first_name.as_deref().unwrap_or(&target.first_name),
        last_name: profile.last_name.as_deref().unwrap_or(&target.last_name),
        email: profile.email.as_deref().unwrap_or(&target.email),
    };
    let password = if partial {
        optional_text(&body, "password", &mut errors)
    } else {
        required_text(&body, "password", &mut errors)
    };
    let password = validate_new_password(&mut errors, password, &context);
    errors.into_result()?;

    let mut fields: Vec<&str> = Vec::new();
    if profile.email.is_some() {
        fields.push("email");
    }
    if profile.first_name.is_some() {
        fields.push("first_name");
    }
    if profile.last_name.is_some() {
        fields.push("last_name");
    }
    if password.is_some() {
        fields.push("password");
    }

    let changes = UpdateUser {
        email: profile.email,
        first_name: profile.first_name,
        last_name: profile.last_name,
        password_hash: password.as_deref().map(hash_password).transpose()?,
    };

    let updated = state
        .store
        .update_user(target.id, changes)
        .await?
        .ok_or_else(ApiError::not_found)?;

    info!(
        user_id = %principal.id,
        username = %principal.username,
        target = %updated.id,
        fields = %fields.join(", "),
        "{} profile update",
        if partial { "Partial" } else { "Full" }
    );
    state.record(
        AuditEvent::new(&principal, AuditAction::ProfileUpdated, updated.id)
            .with_detail(fields.join(",")),
    );

    Ok(Json(UserProfile::from(&updated)))
}

/// Delete an account; its tasks go with it
///
/// # Response
///
/// `204 No Content`
///
/// # Errors
///
/// - `403 Forbidden`: not staff and not the profile owner
/// - `404 Not Found`: no such user
pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let target = profile_target(&state, &principal, &raw_id, Action::Delete).await?;

    if !state.store.delete_user(target.id).await? {
        return Err(ApiError::not_found());
    }

    info!(
        user_id = %principal.id,
        username = %principal.username,
        target = %target.id,
        target_username = %target.username,
        "Deleted profile"
    );
    state.record(AuditEvent::new(&principal, AuditAction::UserDeleted, target.id));

    Ok(StatusCode::NO_CONTENT)
}

/// List users visible to the principal
///
/// # Response
///
/// ```json
/// {
///   "count": 1,
///   "next": null,
///   "previous": null,
///   "results": [
///     { "id": "uuid", "username": "alice", "email": "alice@example.com", "first_name": "", "last_name": "" }
///   ]
/// }
/// ```
pub async fn list_users(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<UserProfile>>> {
    let Query(params) = query?;

    let scope = user_list_scope(&principal);
    let filter = UserFilter::from_params(&params);
    let request = page_request(&params, state.config.listing.page_size)?;
    let links = PageLinks::from_request(&headers, &uri)?;

    match scope {
        UserScope::All => info!(
            user_id = %principal.id,
            username = %principal.username,
            "Staff user accessed the list of all users"
        ),
        UserScope::Only(_) => info!(
            user_id = %principal.id,
            username = %principal.username,
            "Regular user accessed their own profile"
        ),
    }

    let page = state.store.list_users(scope, &filter, request).await?;

    if !filter.is_empty() {
        let total = state
            .store
            .list_users(scope, &UserFilter::default(), PageRequest::new(1, 1))
            .await?
            .count;
        info!(
            user_id = %principal.id,
            filters = %filter,
            "User search: {} users found (from {})",
            page.count,
            total
        );
    }

    Ok(Json(paginate(page, request, &links, |user| UserProfile::from(user))?))
}
