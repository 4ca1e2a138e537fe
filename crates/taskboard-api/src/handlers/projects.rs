//! Project and team endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use taskboard_core::{
    NewProject, PageRequest, ProjectChanges, ProjectFilter, DEFAULT_PROJECT_LIMIT,
    PROJECT_SORT_FIELDS,
};
use taskboard_policy::Caller;
use tracing::debug;
use uuid::Uuid;

use crate::error::{error_response, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{
    AddTeamMemberRequest, DeletedResponse, ErrorResponse, ProjectList, ProjectListQuery,
    ProjectResponse,
};
use crate::AppState;

/// List projects the caller owns or belongs to
#[utoipa::path(
    get,
    path = "/api/projects",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "Page of projects", body = ProjectList),
        (status = 400, description = "Invalid paging or filter", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<ProjectListQuery>,
) -> ApiResult<Json<ProjectList>> {
    debug!(user_id = %caller.id, "Listing projects");

    let request = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        query.sort.as_deref(),
        DEFAULT_PROJECT_LIMIT,
        PROJECT_SORT_FIELDS,
    )
    .map_err(error_response)?;

    let filter = ProjectFilter {
        status: query.status,
        priority: query.priority,
        include_archived: query.include_archived.unwrap_or(false),
    };

    let page = state
        .projects
        .list(&caller, &filter, &request)
        .await
        .map_err(error_response)?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project details", body = ProjectResponse),
        (status = 403, description = "Not the owner or a team member", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<ProjectResponse>> {
    let details = state
        .projects
        .get(&caller, id)
        .await
        .map_err(error_response)?;

    Ok(Json(ProjectResponse::new(details)))
}

/// Create a project owned by the caller
#[utoipa::path(
    post,
    path = "/api/projects",
    request_body = NewProject,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<NewProject>,
) -> ApiResult<(StatusCode, Json<ProjectResponse>)> {
    let details = state
        .projects
        .create(&caller, input)
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(ProjectResponse::new(details))))
}

/// Update project fields; the owner can never be changed
#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = ProjectChanges,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<ProjectChanges>,
) -> ApiResult<Json<ProjectResponse>> {
    let details = state
        .projects
        .update(&caller, id, changes)
        .await
        .map_err(error_response)?;

    Ok(Json(ProjectResponse::new(details)))
}

/// Delete a project with its tasks, comments and memberships
#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    responses(
        (status = 200, description = "Project deleted", body = DeletedResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeletedResponse>> {
    state
        .projects
        .delete(&caller, id)
        .await
        .map_err(error_response)?;

    Ok(Json(DeletedResponse::new()))
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/team",
    params(
        ("id" = Uuid, Path, description = "Project ID")
    ),
    request_body = AddTeamMemberRequest,
    responses(
        (status = 200, description = "Member added", body = ProjectResponse),
        (status = 400, description = "User is already a team member", body = ErrorResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project or user not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn add_team_member(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<AddTeamMemberRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    let details = state
        .projects
        .add_team_member(&caller, id, req.user_id, req.role.unwrap_or_default())
        .await
        .map_err(error_response)?;

    Ok(Json(ProjectResponse::new(details)))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}/team/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Project ID"),
        ("user_id" = Uuid, Path, description = "Member user ID")
    ),
    responses(
        (status = 200, description = "Member removed", body = ProjectResponse),
        (status = 403, description = "Not the project owner", body = ErrorResponse),
        (status = 404, description = "Project not found", body = ErrorResponse)
    ),
    tag = "projects"
)]
pub async fn remove_team_member(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath((id, user_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<ProjectResponse>> {
    let details = state
        .projects
        .remove_team_member(&caller, id, user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(ProjectResponse::new(details)))
}
