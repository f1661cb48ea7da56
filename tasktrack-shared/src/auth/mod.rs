/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and the password policy
/// - [`jwt`]: Access/refresh token issuance and validation
/// - [`principal`]: Resolving the authenticated user from a bearer token
/// - [`authorization`]: Ownership and profile permission checks
///
/// # Example
///
/// ```no_run
/// use tasktrack_shared::auth::jwt::{issue_pair, validate_access_token, TokenLifetimes};
/// use tasktrack_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let pair = issue_pair(Uuid::new_v4(), "secret-key-of-at-least-32-bytes!!", &TokenLifetimes::default())?;
/// validate_access_token(&pair.access, "secret-key-of-at-least-32-bytes!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod password;
pub mod principal;
