/// Storage layer
///
/// [`UserStore`] and [`TaskStore`] describe every persistence operation the
/// API needs. Two backends implement both:
///
/// - [`postgres::PgStore`]: production backend on top of the model queries
/// - [`memory::MemoryStore`]: process-local backend for development and tests
///
/// Task mutations take both the task id and the owner id; a backend must
/// only touch a row when both match, in a single atomic step.
///
/// # Example
///
/// ```
/// use tasktrack_shared::models::task::CreateTask;
/// use tasktrack_shared::models::user::CreateUser;
/// use tasktrack_shared::store::{memory::MemoryStore, TaskStore, UserStore};
///
/// # async fn example() -> Result<(), tasktrack_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser::member("alice", "$argon2id$...")).await?;
/// let task = store
///     .create_task(CreateTask { user_id: user.id, description: "Buy milk".into() })
///     .await?;
///
/// let toggled = store.toggle_task(task.id, user.id).await?.unwrap();
/// assert!(toggled.completed);
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::filter::{ordering::TaskOrdering, task::TaskFilter, user::UserFilter};
use crate::models::task::{CreateTask, Task};
use crate::models::user::{CreateUser, UpdateUser, User, UserKind, UserScope};

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique field already holds this value
    #[error("Duplicate value for {field}")]
    Conflict { field: &'static str },

    /// A write would break a structural rule, e.g. a task without a valid owner
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// The backend could not compile a description pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// The backend failed
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                // unique_violation
                Some("23505") => {
                    if db_err.constraint().is_some_and(|c| c.contains("username")) {
                        return StoreError::Conflict { field: "username" };
                    }
                }
                // foreign_key_violation, not_null_violation, check_violation
                Some("23503") | Some("23502") | Some("23514") => {
                    return StoreError::Integrity(db_err.message().to_string());
                }
                // invalid_regular_expression
                Some("2201B") => {
                    return StoreError::InvalidPattern(db_err.message().to_string());
                }
                _ => {}
            }
        }
        StoreError::Database(err)
    }
}

/// One page of a listing request, 1-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.page_size)
    }
}

/// One page of results plus the total number of matching rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: i64,
}

impl<T> Page<T> {
    /// Number of pages needed for `count` rows; an empty listing still has one page
    pub fn page_count(&self, page_size: u32) -> u32 {
        let size = i64::from(page_size.max(1));
        let pages = (self.count + size - 1) / size;
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Vec<U> {
        self.items.iter().map(f).collect()
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; fails with [`StoreError::Conflict`] on a taken username
    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Applies profile changes; `None` if the user does not exist
    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Deletes a user and all of their tasks; `false` if nothing was deleted
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    async fn record_login(&self, id: Uuid) -> StoreResult<()>;

    async fn list_users(
        &self,
        scope: UserScope,
        filter: &UserFilter,
        page: PageRequest,
    ) -> StoreResult<Page<User>>;

    async fn count_users(&self, kind: UserKind) -> StoreResult<i64>;

    async fn user_ids(&self) -> StoreResult<Vec<Uuid>>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a task; fails with [`StoreError::Integrity`] if the owner is missing
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    /// Looks a task up by id, whoever owns it
    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>>;

    async fn list_tasks(
        &self,
        owner: Uuid,
        filter: &TaskFilter,
        ordering: &TaskOrdering,
        page: PageRequest,
    ) -> StoreResult<Page<Task>>;

    /// Counts tasks of one owner, or of everybody
    async fn count_tasks(&self, owner: Option<Uuid>) -> StoreResult<i64>;

    /// Sets the description when given and bumps `updated_at`
    async fn update_task_description(
        &self,
        id: Uuid,
        owner: Uuid,
        description: Option<String>,
    ) -> StoreResult<Option<Task>>;

    /// Atomically flips `completed`
    async fn toggle_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;

    /// Deletes the task and returns it
    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>>;
}

/// A backend for both users and tasks
#[async_trait]
pub trait Store: UserStore + TaskStore {
    /// Verifies the backend can serve requests
    async fn ping(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;

    /// Releases backend resources on shutdown
    async fn close(&self) {}
}
