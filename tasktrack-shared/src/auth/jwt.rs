/// JWT issuance and validation
///
/// Tokens are HS256-signed and come in pairs: a short-lived access token
/// (default 1 hour) sent as `Authorization: Bearer ...`, and a longer-lived
/// refresh token (default 1 day) that can only be exchanged for a new access
/// token.
///
/// # Example
///
/// ```
/// use tasktrack_shared::auth::jwt::{issue_pair, validate_access_token, TokenLifetimes};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "test-secret-key-at-least-32-bytes-long";
/// let user_id = Uuid::new_v4();
///
/// let pair = issue_pair(user_id, secret, &TokenLifetimes::default())?;
/// let claims = validate_access_token(&pair.access, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value of the `iss` claim
pub const ISSUER: &str = "tasktrack";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    /// An access token was used where a refresh token was expected, or vice versa
    #[error("Expected {expected} token")]
    WrongType { expected: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// How long each token type stays valid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::hours(1),
            refresh: Duration::days(1),
        }
    }
}

impl TokenLifetimes {
    pub fn for_type(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// Standard claims plus the token type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,

    /// Unique token id
    pub jti: Uuid,

    pub token_type: TokenType,
}

impl Claims {
    /// Claims valid from now for `expires_in`
    pub fn with_expiration(user_id: Uuid, token_type: TokenType, expires_in: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
            nbf: now.timestamp(),
            jti: Uuid::new_v4(),
            token_type,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access and refresh token issued together
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Checks signature, expiry, not-before and issuer, and returns the claims
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

fn validate_typed(token: &str, secret: &str, expected: TokenType) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;
    if claims.token_type != expected {
        return Err(JwtError::WrongType {
            expected: expected.as_str(),
        });
    }
    Ok(claims)
}

pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Access)
}

pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    validate_typed(token, secret, TokenType::Refresh)
}

/// Issues a fresh access/refresh pair for a user
pub fn issue_pair(
    user_id: Uuid,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<TokenPair, JwtError> {
    let access = Claims::with_expiration(user_id, TokenType::Access, lifetimes.access);
    let refresh = Claims::with_expiration(user_id, TokenType::Refresh, lifetimes.refresh);

    Ok(TokenPair {
        access: create_token(&access, secret)?,
        refresh: create_token(&refresh, secret)?,
    })
}

/// Issues a new access token for the subject of an already validated refresh token
pub fn access_token_for(
    refresh_claims: &Claims,
    secret: &str,
    lifetimes: &TokenLifetimes,
) -> Result<String, JwtError> {
    let claims = Claims::with_expiration(refresh_claims.sub, TokenType::Access, lifetimes.access);
    create_token(&claims, secret)
}
