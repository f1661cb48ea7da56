/// Resolving the authenticated principal
///
/// A request is authenticated by an access token in the `Authorization:
/// Bearer` header. The token's subject is loaded from the [`UserStore`] on
/// every request, so deleting or deactivating a user revokes their tokens
/// immediately.
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::auth::principal::authenticate;
/// use tasktrack_shared::store::memory::MemoryStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = MemoryStore::new();
/// let principal = authenticate(&store, Some("Bearer eyJ..."), "secret").await?;
/// println!("Hello, {}!", principal.username);
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use super::password::{verify_password, PasswordError};
use crate::models::user::User;
use crate::store::{StoreError, UserStore};

/// The authenticated user for the current request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub is_staff: bool,
    pub is_superuser: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("Authorization header must be 'Bearer <token>'")]
    InvalidFormat,

    #[error(transparent)]
    InvalidToken(#[from] JwtError),

    /// The token's subject no longer exists
    #[error("User not found")]
    UnknownUser,

    #[error("User is inactive")]
    InactiveUser,

    /// Wrong username or password, or an inactive account, at login
    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts the token from an `Authorization` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header.ok_or(AuthError::MissingCredentials)?;
    let token = header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::InvalidFormat)?;

    if token.is_empty() {
        return Err(AuthError::InvalidFormat);
    }
    Ok(token)
}

/// Validates an access token and loads its active user
pub async fn authenticate<S: UserStore + ?Sized>(
    store: &S,
    authorization: Option<&str>,
    secret: &str,
) -> Result<Principal, AuthError> {
    let token = bearer_token(authorization)?;
    let claims = validate_access_token(token, secret)?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UnknownUser)?;

    if !user.is_active {
        return Err(AuthError::InactiveUser);
    }

    Ok(Principal::from(&user))
}

/// Checks a username/password pair for login
///
/// Unknown users, wrong passwords and inactive accounts all fail the same way.
pub async fn authenticate_credentials<S: UserStore + ?Sized>(
    store: &S,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = store
        .find_user_by_username(username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !verify_password(password, &user.password_hash)? || !user.is_active {
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}
