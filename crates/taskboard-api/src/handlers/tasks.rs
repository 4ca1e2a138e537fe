//! Task endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use taskboard_core::{
    NewTask, PageRequest, TaskChanges, TaskFilter, DEFAULT_TASK_LIMIT, TASK_SORT_FIELDS,
};
use taskboard_policy::Caller;
use uuid::Uuid;

use crate::error::{error_response, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    AddCommentRequest, DeletedResponse, ErrorResponse, TaskList, TaskListQuery, TaskResponse,
    UpdateStatusRequest,
};
use crate::AppState;

/// List tasks in projects the caller owns or belongs to
#[utoipa::path(
    get,
    path = "/api/tasks",
    params(TaskListQuery),
    responses(
        (status = 200, description = "Page of tasks", body = TaskList),
        (status = 400, description = "Invalid paging or filter", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<TaskList>> {
    let request = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        query.sort.as_deref(),
        DEFAULT_TASK_LIMIT,
        TASK_SORT_FIELDS,
    )
    .map_err(error_response)?;

    let filter = TaskFilter {
        project: query.project,
        assigned_to: query.assigned_to,
        status: query.status,
        priority: query.priority,
        due_from: query.due_date_from,
        due_to: query.due_date_to,
    };

    let page = state
        .tasks
        .list(&caller, &filter, &request)
        .await
        .map_err(error_response)?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task details", body = TaskResponse),
        (status = 403, description = "No access to the task", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let details = state.tasks.get(&caller, id).await.map_err(error_response)?;

    Ok(Json(TaskResponse::new(details)))
}

/// Create a task inside a project the caller can access
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = NewTask,
    responses(
        (status = 201, description = "Task created", body = TaskResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "No access to the project", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<NewTask>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let details = state
        .tasks
        .create(&caller, input)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(TaskResponse::new(details))))
}

/// Update task fields; the project and creator are fixed
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = TaskChanges,
    responses(
        (status = 200, description = "Task updated", body = TaskResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "No access to the task", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<TaskChanges>,
) -> ApiResult<Json<TaskResponse>> {
    let details = state
        .tasks
        .update(&caller, id, changes)
        .await
        .map_err(error_response)?;

    Ok(Json(TaskResponse::new(details)))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task deleted", body = DeletedResponse),
        (status = 403, description = "Viewers cannot delete tasks", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeletedResponse>> {
    state
        .tasks
        .delete(&caller, id)
        .await
        .map_err(error_response)?;

    Ok(Json(DeletedResponse::new()))
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/comments",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = AddCommentRequest,
    responses(
        (status = 200, description = "Comment added", body = TaskResponse),
        (status = 400, description = "Comment text missing or too long", body = ErrorResponse),
        (status = 403, description = "No access to the task", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddCommentRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let details = state
        .tasks
        .add_comment(&caller, id, &req.text)
        .await
        .map_err(error_response)?;

    Ok(Json(TaskResponse::new(details)))
}

/// Change only the status of a task
#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = TaskResponse),
        (status = 400, description = "Unknown status", body = ErrorResponse),
        (status = 403, description = "No access to the task", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn update_task_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let details = state
        .tasks
        .update_status(&caller, id, req.status)
        .await
        .map_err(error_response)?;

    Ok(Json(TaskResponse::new(details)))
}
