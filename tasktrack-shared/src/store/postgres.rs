/// Postgres-backed store
///
/// Thin adapter from the store traits to the query functions on
/// [`User`] and [`Task`].

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{Page, PageRequest, Store, StoreResult, TaskStore, UserStore};
use crate::db::pool::{close_pool, health_check};
use crate::filter::{ordering::TaskOrdering, task::TaskFilter, user::UserFilter};
use crate::models::task::{CreateTask, Task};
use crate::models::user::{CreateUser, UpdateUser, User, UserKind, UserScope};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_username(&self.pool, username).await?)
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        Ok(User::update(&self.pool, id, data).await?)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        Ok(User::delete(&self.pool, id).await?)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        Ok(User::update_last_login(&self.pool, id).await?)
    }

    async fn list_users(
        &self,
        scope: UserScope,
        filter: &UserFilter,
        page: PageRequest,
    ) -> StoreResult<Page<User>> {
        Ok(User::list(&self.pool, scope, filter, page).await?)
    }

    async fn count_users(&self, kind: UserKind) -> StoreResult<i64> {
        Ok(User::count_by_kind(&self.pool, kind).await?)
    }

    async fn user_ids(&self) -> StoreResult<Vec<Uuid>> {
        Ok(User::list_ids(&self.pool).await?)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(
        &self,
        owner: Uuid,
        filter: &TaskFilter,
        ordering: &TaskOrdering,
        page: PageRequest,
    ) -> StoreResult<Page<Task>> {
        Ok(Task::list_for_owner(&self.pool, owner, filter, ordering, page).await?)
    }

    async fn count_tasks(&self, owner: Option<Uuid>) -> StoreResult<i64> {
        Ok(Task::count(&self.pool, owner).await?)
    }

    async fn update_task_description(
        &self,
        id: Uuid,
        owner: Uuid,
        description: Option<String>,
    ) -> StoreResult<Option<Task>> {
        Ok(Task::update_description(&self.pool, id, owner, description).await?)
    }

    async fn toggle_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::toggle_completion(&self.pool, id, owner).await?)
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        Ok(Task::delete(&self.pool, id, owner).await?)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn close(&self) {
        close_pool(self.pool.clone()).await;
    }
}
