/// Task endpoints
///
/// Every task endpoint acts only on tasks owned by the authenticated user.
/// A task owned by someone else is reported exactly like a missing one.
///
/// # Endpoints
///
/// - `GET /api/tasks/` - List own tasks (filterable, orderable, paginated)
/// - `POST /api/tasks/create/` - Create a task
/// - `GET /api/tasks/:id/` - Task detail
/// - `PATCH /api/tasks/:id/update-description/` - Change the description
/// - `PATCH /api/tasks/:id/toggle-complete/` - Flip `completed`
/// - `DELETE /api/tasks/:id/delete/` - Delete a task
///
/// # List parameters
///
/// | parameter | meaning |
/// |---|---|
/// | `description` | case-insensitive exact match |
/// | `description__contains` | case-insensitive substring |
/// | `description__startswith` | case-insensitive prefix |
/// | `description__regex` | case-insensitive regex search |
/// | `completed` | `true` / `false` |
/// | `created_after`, `created_before` | local creation date bounds, inclusive |
/// | `created_on` | local creation date |
/// | `ordering` | `creation_time`, `updated_at`, `-` prefix for descending |
/// | `page` | 1-based page number |

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use tasktrack_shared::{
    audit::{AuditAction, AuditEvent},
    auth::{
        authorization::{authorize_task, Action},
        principal::Principal,
    },
    filter::{ordering::TaskOrdering, task::TaskFilter, QueryParams},
    models::task::{CreateTask, Task, TaskDetail, TaskSummary},
    store::TaskStore,
    validation::{FieldErrors, BLANK},
};
use tracing::info;

use super::parse_id;
use crate::{
    app::AppState,
    body::{optional_text, required_text, JsonObject},
    error::{ApiError, ApiResult},
    pagination::{page_request, paginate, PageLinks, Paginated},
};

/// Trims a description and rejects it when nothing is left
fn clean_description(description: &str) -> Result<String, FieldErrors> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(FieldErrors::single("description", BLANK));
    }
    Ok(trimmed.to_string())
}

/// Loads a task and checks the principal owns it
async fn owned_task(
    state: &AppState,
    principal: &Principal,
    raw_id: &str,
    action: Action,
) -> ApiResult<Task> {
    let id = parse_id(raw_id)?;
    let task = state.store.find_task(id).await?;
    Ok(authorize_task(principal, task, action)?)
}

/// List the authenticated user's tasks
///
/// # Response
///
/// ```json
/// {
///   "count": 1,
///   "next": null,
///   "previous": null,
///   "results": [
///     { "id": "uuid", "description": "Buy milk", "completed": false, "creation_time": "..." }
///   ]
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: invalid filter values, keyed by parameter
/// - `404 Not Found`: `Invalid page.`
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> ApiResult<Json<Paginated<TaskSummary>>> {
    let Query(params) = query?;

    let filter = TaskFilter::from_params(&params, state.config.listing.time_zone)?;
    let ordering = TaskOrdering::from_param(params.get("ordering").map(String::as_str));
    let request = page_request(&params, state.config.listing.page_size)?;
    let links = PageLinks::from_request(&headers, &uri)?;

    let page = state
        .store
        .list_tasks(principal.id, &filter, &ordering, request)
        .await?;

    if filter.is_empty() {
        info!(
            user_id = %principal.id,
            username = %principal.username,
            count = page.count,
            "Listed all their tasks"
        );
    } else {
        let total = state.store.count_tasks(Some(principal.id)).await?;
        info!(
            user_id = %principal.id,
            username = %principal.username,
            filters = %filter,
            "Task search: {} tasks found (from {})",
            page.count,
            total
        );
    }

    Ok(Json(paginate(page, request, &links, |task| TaskSummary::from(task))?))
}

/// Create a task owned by the authenticated user
///
/// # Endpoint
///
/// ```text
/// POST /api/tasks/create/
/// Content-Type: application/json
///
/// { "description": "Buy milk" }
/// ```
///
/// # Response
///
/// `201 Created` with the full task; `completed` is always `false`.
///
/// Only `description` is writable; `completed`, `creation_time` and
/// `updated_at` are ignored when sent.
///
/// # Errors
///
/// - `400 Bad Request`: `description` missing, null, not text or blank
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let description = match required_text(&body, "description", &mut errors) {
        Some(raw) => clean_description(&raw)?,
        None => return Err(errors.into()),
    };

    let task = state
        .store
        .create_task(CreateTask {
            user_id: principal.id,
            description,
        })
        .await?;

    info!(
        user_id = %principal.id,
        username = %principal.username,
        task_id = %task.id,
        description = %task.description,
        "Created task"
    );
    state.record(AuditEvent::new(&principal, AuditAction::TaskCreated, task.id));

    Ok((StatusCode::CREATED, Json(TaskDetail::from(&task))))
}

/// Task detail
///
/// # Errors
///
/// - `404 Not Found`: missing, or owned by someone else
pub async fn get_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskDetail>> {
    let task = owned_task(&state, &principal, &id, Action::Read).await?;

    info!(user_id = %principal.id, task_id = %task.id, "Retrieved task");

    Ok(Json(TaskDetail::from(&task)))
}

/// Change a task's description
///
/// Ownership is checked before the body is validated, so a foreign task is a
/// 404 even with an invalid body. An absent description only bumps
/// `updated_at`.
///
/// # Errors
///
/// - `400 Bad Request`: description null, not text or blank
/// - `404 Not Found`: missing, or owned by someone else
pub async fn update_description(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    payload: Result<Json<JsonObject>, JsonRejection>,
) -> ApiResult<Json<TaskDetail>> {
    let task = owned_task(&state, &principal, &id, Action::Update).await?;
    let Json(body) = payload?;

    let mut errors = FieldErrors::new();
    let description = optional_text(&body, "description", &mut errors);
    errors.into_result()?;
    let description = description.as_deref().map(clean_description).transpose()?;

    let updated = state
        .store
        .update_task_description(task.id, principal.id, description)
        .await?
        .ok_or_else(ApiError::not_found)?;

    if updated.description != task.description {
        info!(
            user_id = %principal.id,
            task_id = %task.id,
            "Updated task description from '{}' to '{}'",
            task.description,
            updated.description
        );
    }
    state.record(AuditEvent::new(&principal, AuditAction::TaskUpdated, task.id));

    Ok(Json(TaskDetail::from(&updated)))
}

/// Flip a task between pending and completed
///
/// # Errors
///
/// - `404 Not Found`: missing, or owned by someone else
pub async fn toggle_complete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskDetail>> {
    let task = owned_task(&state, &principal, &id, Action::Update).await?;

    let toggled = state
        .store
        .toggle_task(task.id, principal.id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    info!(
        user_id = %principal.id,
        task_id = %task.id,
        "Toggled task status from {} to {}",
        task.status_label(),
        toggled.status_label()
    );
    state.record(
        AuditEvent::new(&principal, AuditAction::TaskToggled, task.id)
            .with_detail(toggled.status_label()),
    );

    Ok(Json(TaskDetail::from(&toggled)))
}

/// Delete a task
///
/// # Response
///
/// `204 No Content`
///
/// # Errors
///
/// - `404 Not Found`: missing, or owned by someone else
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let task = owned_task(&state, &principal, &id, Action::Delete).await?;

    state
        .store
        .delete_task(task.id, principal.id)
        .await?
        .ok_or_else(ApiError::not_found)?;

    info!(
        user_id = %principal.id,
        task_id = %task.id,
        description = %task.description,
        "Deleted task"
    );
    state.record(AuditEvent::new(&principal, AuditAction::TaskDeleted, task.id));

    Ok(StatusCode::NO_CONTENT)
}
