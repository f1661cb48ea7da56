/// Password hashing and password policy
///
/// Hashing uses Argon2id (64 MB memory, 3 passes, 4 lanes, 32-byte output);
/// the PHC string stores the parameters and salt so verification needs
/// nothing else.
///
/// The policy ([`validate_password`]) runs four checks and reports every
/// failure:
///
/// 1. not too similar to the username, first name, last name or email
/// 2. at least [`MIN_LENGTH`] characters
/// 3. not one of a list of commonly used passwords
/// 4. not entirely numeric
///
/// # Example
///
/// ```
/// use tasktrack_shared::auth::password::{hash_password, validate_password, verify_password, PasswordContext};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let context = PasswordContext { username: "newuser", ..Default::default() };
/// assert!(validate_password("StrongP@ssword123", &context).is_empty());
/// assert!(!validate_password("password", &context).is_empty());
///
/// let hash = hash_password("StrongP@ssword123")?;
/// assert!(verify_password("StrongP@ssword123", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, ParamsBuilder, Version,
};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Minimum password length, in characters
pub const MIN_LENGTH: usize = 8;

/// Similarity ratio at or above which a password is rejected
const MAX_SIMILARITY: f64 = 0.7;

const COMMON_PASSWORDS: &str = include_str!("common_passwords.txt");

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Hashes a password with Argon2id and a random 16-byte salt
///
/// Returns a PHC string such as `$argon2id$v=19$m=65536,t=3,p=4$...`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let params = ParamsBuilder::new()
        .m_cost(65536)
        .t_cost(3)
        .p_cost(4)
        .output_len(32)
        .build()
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Checks a password against a PHC hash in constant time
///
/// `Ok(false)` means the password is wrong; `Err` means the hash is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
    }
}

/// Account attributes a password must not resemble
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordContext<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
}

impl<'a> PasswordContext<'a> {
    fn attributes(&self) -> [(&'static str, &'a str); 4] {
        [
            ("username", self.username),
            ("first name", self.first_name),
            ("last name", self.last_name),
            ("email address", self.email),
        ]
    }
}

/// Runs the password policy; an empty result means the password is acceptable
pub fn validate_password(password: &str, context: &PasswordContext<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    if let Some(attribute) = similar_attribute(password, context) {
        errors.push(format!("The password is too similar to the {attribute}."));
    }

    if password.chars().count() < MIN_LENGTH {
        errors.push(format!(
            "This password is too short. It must contain at least {MIN_LENGTH} characters."
        ));
    }

    if is_common(password) {
        errors.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_numeric()) {
        errors.push("This password is entirely numeric.".to_string());
    }

    errors
}

fn common_passwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        COMMON_PASSWORDS
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    })
}

fn is_common(password: &str) -> bool {
    common_passwords().contains(password.trim().to_lowercase().as_str())
}

/// First attribute the password is too similar to
///
/// Each attribute is compared whole and split into word fragments. Fragments
/// that are tiny relative to a long password are skipped.
fn similar_attribute(password: &str, context: &PasswordContext<'_>) -> Option<&'static str> {
    let password_lower = password.to_lowercase();

    context.attributes().into_iter().find_map(|(name, value)| {
        if value.is_empty() {
            return None;
        }
        let value_lower = value.to_lowercase();
        let mut parts: Vec<&str> = value_lower
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .collect();
        parts.push(&value_lower);

        parts
            .into_iter()
            .filter(|part| !exceeds_length_ratio(password, part))
            .any(|part| quick_ratio(&password_lower, part) >= MAX_SIMILARITY)
            .then_some(name)
    })
}

/// True when the password is so much longer than `value` that they cannot be similar
fn exceeds_length_ratio(password: &str, value: &str) -> bool {
    let password_len = password.chars().count() as f64;
    let value_len = value.chars().count() as f64;
    password_len >= 10.0 * value_len && value_len < MAX_SIMILARITY / 2.0 * password_len
}

/// Upper bound on the similarity of two strings: shared characters (as a
/// multiset) over total length
fn quick_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }

    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }

    let mut matches = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c) {
            if *count > 0 {
                *count -= 1;
                matches += 1;
            }
        }
    }

    2.0 * matches as f64 / total as f64
}
