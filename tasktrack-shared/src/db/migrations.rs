/// Embedded schema migrations
///
/// SQL files live in `tasktrack-shared/migrations/` as reversible pairs
/// (`{version}_{name}.up.sql` / `.down.sql`) and are compiled into the binary.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Running database migrations");

    match sqlx::migrate!("./migrations").run(pool).await {
        Ok(()) => {
            info!("Database schema is up to date");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
