//! # Tasktrack seeder
//!
//! Fills the configured store with a superuser, staff and regular accounts,
//! and a batch of random tasks. Running it again only tops up what is missing.
//!
//! ```bash
//! cargo run -p tasktrack-api --bin tasktrack-seed
//! ```

use rand::{rngs::StdRng, SeedableRng};
use tasktrack_api::{app::open_store, config::Config};
use tasktrack_shared::{
    seed::{seed, SEED_PASSWORD},
    store::Store,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tasktrack_shared=info,tasktrack_api=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    if config.is_memory_store() {
        tracing::warn!("Seeding the in-memory store; the data is dropped when this process exits");
    }

    let store = open_store(&config).await?;
    let mut rng = StdRng::from_entropy();
    let report = seed(store.as_ref(), &mut rng).await;
    store.close().await;
    let report = report?;

    println!(
        "Seeded {} superuser(s), {} staff user(s), {} regular user(s) and {} task(s)",
        u8::from(report.superuser_created),
        report.staff_created,
        report.regular_created,
        report.tasks_created
    );
    println!("All seeded accounts use the password '{SEED_PASSWORD}'. Change it before exposing the data.");

    Ok(())
}
