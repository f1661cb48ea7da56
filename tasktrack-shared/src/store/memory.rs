/// In-memory store
///
/// Keeps users and tasks in hash maps behind one `tokio::sync::RwLock`, so
/// every operation is atomic with respect to the others. Enforces the same
/// structural rules as the Postgres schema: unique usernames, tasks need an
/// existing owner and a non-blank description, and deleting a user cascades
/// to their tasks.
///
/// Selected with `DATABASE_URL=memory`; also the backend for API tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Page, PageRequest, Store, StoreError, StoreResult, TaskStore, UserStore};
use crate::filter::{ordering::TaskOrdering, task::TaskFilter, user::UserFilter};
use crate::models::task::{CreateTask, Task};
use crate::models::user::{CreateUser, UpdateUser, User, UserKind, UserScope};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    tasks: HashMap<Uuid, Task>,
    last_timestamp: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing wall-clock timestamps, so ordering by time is total
    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides a task's creation time; for fixtures that need dated tasks
    pub async fn set_task_creation_time(&self, id: Uuid, at: DateTime<Utc>) -> bool {
        let mut state = self.state.write().await;
        match state.tasks.get_mut(&id) {
            Some(task) => {
                task.creation_time = at;
                true
            }
            None => false,
        }
    }

    /// Activates or deactivates an account; for fixtures
    pub async fn set_user_active(&self, id: Uuid, is_active: bool) -> bool {
        let mut state = self.state.write().await;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = is_active;
                true
            }
            None => false,
        }
    }
}

fn paginate<T: Clone>(items: &[T], page: PageRequest) -> Page<T> {
    let count = items.len() as i64;
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let items = items
        .iter()
        .skip(offset)
        .take(page.page_size as usize)
        .cloned()
        .collect();
    Page { items, count }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == data.username) {
            return Err(StoreError::Conflict { field: "username" });
        }

        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            is_staff: data.is_staff,
            is_superuser: data.is_superuser,
            is_active: true,
            date_joined: state.now(),
            last_login: None,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        Ok(state.users.get_mut(&id).map(|user| {
            data.apply(user);
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }
        state.tasks.retain(|_, task| task.user_id != id);
        Ok(true)
    }

    async fn record_login(&self, id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let now = state.now();
        if let Some(user) = state.users.get_mut(&id) {
            user.last_login = Some(now);
        }
        Ok(())
    }

    async fn list_users(
        &self,
        scope: UserScope,
        filter: &UserFilter,
        page: PageRequest,
    ) -> StoreResult<Page<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|user| match scope {
                UserScope::All => true,
                UserScope::Only(id) => user.id == id,
            })
            .filter(|user| filter.matches(user))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.date_joined.cmp(&b.date_joined).then(a.id.cmp(&b.id)));
        Ok(paginate(&users, page))
    }

    async fn count_users(&self, kind: UserKind) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.users.values().filter(|u| kind.matches(u)).count() as i64)
    }

    async fn user_ids(&self) -> StoreResult<Vec<Uuid>> {
        let state = self.state.read().await;
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by_key(|u| u.date_joined);
        Ok(users.into_iter().map(|u| u.id).collect())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&data.user_id) {
            return Err(StoreError::Integrity(format!(
                "task owner {} does not exist",
                data.user_id
            )));
        }
        if data.description.trim().is_empty() {
            return Err(StoreError::Integrity("task description is blank".to_string()));
        }

        let now = state.now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            description: data.description,
            completed: false,
            creation_time: now,
            updated_at: now,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.state.read().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(
        &self,
        owner: Uuid,
        filter: &TaskFilter,
        ordering: &TaskOrdering,
        page: PageRequest,
    ) -> StoreResult<Page<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.user_id == owner && filter.matches(task))
            .cloned()
            .collect();
        ordering.sort(&mut tasks);
        Ok(paginate(&tasks, page))
    }

    async fn count_tasks(&self, owner: Option<Uuid>) -> StoreResult<i64> {
        let state = self.state.read().await;
        let count = state
            .tasks
            .values()
            .filter(|task| owner.map_or(true, |owner| task.user_id == owner))
            .count();
        Ok(count as i64)
    }

    async fn update_task_description(
        &self,
        id: Uuid,
        owner: Uuid,
        description: Option<String>,
    ) -> StoreResult<Option<Task>> {
        if description.as_deref().is_some_and(|d| d.trim().is_empty()) {
            return Err(StoreError::Integrity("task description is blank".to_string()));
        }

        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state
            .tasks
            .get_mut(&id)
            .filter(|task| task.user_id == owner)
            .map(|task| {
                if let Some(description) = description {
                    task.description = description;
                }
                task.updated_at = now;
                task.clone()
            }))
    }

    async fn toggle_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let now = state.now();
        Ok(state
            .tasks
            .get_mut(&id)
            .filter(|task| task.user_id == owner)
            .map(|task| {
                task.completed = !task.completed;
                task.updated_at = now;
                task.clone()
            }))
    }

    async fn delete_task(&self, id: Uuid, owner: Uuid) -> StoreResult<Option<Task>> {
        let mut state = self.state.write().await;
        let owned = state.tasks.get(&id).is_some_and(|task| task.user_id == owner);
        Ok(if owned { state.tasks.remove(&id) } else { None })
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
