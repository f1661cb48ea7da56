/// Task model and database operations
///
/// A task belongs to exactly one user for its whole life. Every mutating
/// query here is scoped by both the task id and the owner id, so a statement
/// can never touch somebody else's row.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users (id) ON DELETE CASCADE,
///     description TEXT NOT NULL CHECK (btrim(description) <> ''),
///     completed BOOLEAN NOT NULL DEFAULT FALSE,
///     creation_time TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::filter::{ordering::TaskOrdering, task::TaskFilter};
use crate::store::{Page, PageRequest};

const TASK_COLUMNS: &str = "id, user_id, description, completed, creation_time, updated_at";

/// Descriptions longer than this are shortened in list views
pub const SUMMARY_LENGTH: usize = 50;

/// A to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,

    /// Owner, fixed at creation
    pub user_id: Uuid,

    pub description: String,
    pub completed: bool,

    /// Set once on insert
    pub creation_time: DateTime<Utc>,

    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
///
/// There is deliberately no `completed` field: new tasks always start open.
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub description: String,
}

/// List representation of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,

    /// Truncated to [`SUMMARY_LENGTH`] characters plus `...`
    pub description: String,

    pub completed: bool,
    pub creation_time: DateTime<Utc>,
}

/// Full representation of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: Uuid,
    pub description: String,
    pub completed: bool,
    pub creation_time: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskSummary {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            description: task.short_description(),
            completed: task.completed,
            creation_time: task.creation_time,
        }
    }
}

impl From<&Task> for TaskDetail {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            description: task.description.clone(),
            completed: task.completed,
            creation_time: task.creation_time,
            updated_at: task.updated_at,
        }
    }
}

impl Task {
    /// Description cut to [`SUMMARY_LENGTH`] characters, with `...` appended when cut
    pub fn short_description(&self) -> String {
        if self.description.chars().count() > SUMMARY_LENGTH {
            let head: String = self.description.chars().take(SUMMARY_LENGTH).collect();
            format!("{head}...")
        } else {
            self.description.clone()
        }
    }

    /// Human-readable completion state, used in audit lines
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "pending"
        }
    }

    /// Inserts a task owned by `data.user_id`
    ///
    /// # Errors
    ///
    /// Fails with a foreign key violation when the owner does not exist.
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let sql = format!(
            "INSERT INTO tasks (user_id, description) VALUES ($1, $2) RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(data.user_id)
            .bind(data.description)
            .fetch_one(pool)
            .await
    }

    /// Looks a task up by id regardless of owner
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists the owner's tasks matching `filter`
    pub async fn list_for_owner(
        pool: &PgPool,
        owner: Uuid,
        filter: &TaskFilter,
        ordering: &TaskOrdering,
        page: PageRequest,
    ) -> Result<Page<Self>, sqlx::Error> {
        let mut count_query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks WHERE user_id = ");
        count_query.push_bind(owner);
        filter.push_conditions(&mut count_query);
        let (count,): (i64,) = count_query.build_query_as().fetch_one(pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "
        ));
        select.push_bind(owner);
        filter.push_conditions(&mut select);
        select.push(" ORDER BY ");
        select.push(ordering.to_sql());
        select.push(" LIMIT ");
        select.push_bind(page.limit());
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let items = select.build_query_as::<Task>().fetch_all(pool).await?;
        Ok(Page { items, count })
    }

    /// Counts tasks, for one owner or for everybody
    pub async fn count(pool: &PgPool, owner: Option<Uuid>) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = match owner {
            Some(owner) => {
                sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
                    .bind(owner)
                    .fetch_one(pool)
                    .await?
            }
            None => sqlx::query_as("SELECT COUNT(*) FROM tasks").fetch_one(pool).await?,
        };
        Ok(count)
    }

    /// Replaces the description (when given) and bumps `updated_at`
    pub async fn update_description(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
        description: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE tasks SET description = COALESCE($3, description), updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .bind(description)
            .fetch_optional(pool)
            .await
    }

    /// Flips `completed` in a single statement
    ///
    /// Concurrent toggles serialize on the row lock, each one reading the
    /// value left by the previous one.
    pub async fn toggle_completion(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "UPDATE tasks SET completed = NOT completed, updated_at = NOW() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }

    /// Deletes the task and returns the removed row
    pub async fn delete(pool: &PgPool, id: Uuid, owner: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            "DELETE FROM tasks WHERE id = $1 AND user_id = $2 RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await
    }
}
