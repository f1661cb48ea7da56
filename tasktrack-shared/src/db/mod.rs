/// Database layer
///
/// - `pool`: Postgres connection pool with health checks
/// - `migrations`: Embedded schema migrations
///
/// Queries live next to the models in [`crate::models`].

pub mod migrations;
pub mod pool;
