/// Administrative seeding
///
/// Tops the store up to a known sample data set:
///
/// - one superuser `admin` (skipped if any superuser exists)
/// - [`STAFF_USERS`] staff accounts
/// - [`REGULAR_USERS`] regular accounts
/// - [`TASKS`] tasks with random owners, descriptions and completion state
///
/// Seeding is idempotent with respect to these counts: running it twice does
/// not create more rows. Every account it creates gets [`SEED_PASSWORD`].

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

use crate::auth::password::{hash_password, PasswordError};
use crate::models::task::CreateTask;
use crate::models::user::{CreateUser, UserKind};
use crate::store::{Store, StoreError, TaskStore, UserStore};

pub const SEED_PASSWORD: &str = "password123";

pub const STAFF_USERS: i64 = 2;
pub const REGULAR_USERS: i64 = 10;
pub const TASKS: i64 = 30;

const DESCRIPTIONS: &[&str] = &[
    "Review the project documentation",
    "Update system dependencies",
    "Write unit tests",
    "Implement the new feature",
    "Fix reported bugs",
    "Optimize database queries",
    "Refactor legacy code",
    "Review pending pull requests",
    "Configure the CI/CD pipeline",
    "Update the API documentation",
];

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No users to assign tasks to")]
    NoUsers,
}

/// What a seeding run created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub superuser_created: bool,
    pub staff_created: i64,
    pub regular_created: i64,
    pub tasks_created: i64,
}

/// Seeds `store`, using `rng` for task owners, descriptions and completion
pub async fn seed<R: Rng + Send>(store: &dyn Store, rng: &mut R) -> Result<SeedReport, SeedError> {
    let password_hash = hash_password(SEED_PASSWORD)?;
    let mut report = SeedReport::default();

    if store.count_users(UserKind::Superuser).await? == 0 {
        store
            .create_user(CreateUser {
                username: "admin".into(),
                email: "admin@example.com".into(),
                password_hash: password_hash.clone(),
                first_name: "Admin".into(),
                last_name: "User".into(),
                is_staff: true,
                is_superuser: true,
            })
            .await?;
        report.superuser_created = true;
        info!("Created superuser admin");
    } else {
        info!("Superuser already exists, skipping creation");
    }

    let missing_staff = STAFF_USERS - store.count_users(UserKind::Staff).await?;
    report.staff_created = create_users(store, "staff", true, missing_staff, &password_hash).await?;

    let missing_regular = REGULAR_USERS - store.count_users(UserKind::Regular).await?;
    report.regular_created =
        create_users(store, "user", false, missing_regular, &password_hash).await?;

    let missing_tasks = TASKS - store.count_tasks(None).await?;
    if missing_tasks > 0 {
        let user_ids = store.user_ids().await?;
        for _ in 0..missing_tasks {
            let owner = *user_ids.choose(rng).ok_or(SeedError::NoUsers)?;
            let username = store
                .find_user(owner)
                .await?
                .map(|u| u.username)
                .unwrap_or_default();
            let description = format!(
                "{} for {}",
                DESCRIPTIONS.choose(rng).copied().unwrap_or("Sample task"),
                username
            );

            let task = store
                .create_task(CreateTask {
                    user_id: owner,
                    description,
                })
                .await?;
            if rng.gen_bool(0.5) {
                store.toggle_task(task.id, owner).await?;
            }
            report.tasks_created += 1;
        }
        info!(count = report.tasks_created, "Created tasks");
    }

    Ok(report)
}

/// Creates `count` users named `{prefix}{n}`, skipping names already taken
async fn create_users(
    store: &dyn Store,
    prefix: &str,
    is_staff: bool,
    count: i64,
    password_hash: &str,
) -> Result<i64, SeedError> {
    let mut created = 0;
    let mut n = 1;

    while created < count {
        let username = format!("{prefix}{n}");
        n += 1;
        if store.find_user_by_username(&username).await?.is_some() {
            continue;
        }

        store
            .create_user(CreateUser {
                email: format!("{username}@example.com"),
                is_staff,
                ..CreateUser::member(username, password_hash)
            })
            .await?;
        created += 1;
    }

    if created > 0 {
        info!(count = created, staff = is_staff, "Created users");
    }
    Ok(created)
}
