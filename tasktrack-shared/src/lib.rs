//! # Tasktrack Shared Library
//!
//! Domain types and business rules shared by the Tasktrack API server and its
//! administrative tooling.
//!
//! ## Module Organization
//!
//! - `models`: Users and tasks, plus their Postgres operations
//! - `store`: Storage traits with Postgres and in-memory backends
//! - `auth`: Password hashing and policy, JWT, principal resolution, permissions
//! - `filter`: Query filters and ordering for list endpoints
//! - `validation`: Per-field error collection
//! - `audit`: Audit trail for mutations
//! - `db`: Connection pool and migrations
//! - `seed`: Administrative seeding of users and tasks

pub mod audit;
pub mod auth;
pub mod db;
pub mod filter;
pub mod models;
pub mod seed;
pub mod store;
pub mod validation;

/// Current version of the Tasktrack shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
