//! User directory endpoints (administrators only)

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;
use taskboard_core::{AccountChanges, NewAccount, PageRequest, DEFAULT_USER_LIMIT, USER_SORT_FIELDS};
use taskboard_policy::Caller;
use uuid::Uuid;

use crate::error::{error_response, ApiResult};
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::models::{DeletedResponse, ErrorResponse, User, UserList, UserListQuery, UserResponse};
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Page of users", body = UserList),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiQuery(query): ApiQuery<UserListQuery>,
) -> ApiResult<Json<UserList>> {
    let request = PageRequest::parse(
        query.page.as_deref(),
        query.limit.as_deref(),
        query.sort.as_deref(),
        DEFAULT_USER_LIMIT,
        USER_SORT_FIELDS,
    )
    .map_err(error_response)?;

    let page = state
        .users
        .list(&caller, &request)
        .await
        .map_err(error_response)?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<UserResponse>> {
    let details = state.users.get(&caller, id).await.map_err(error_response)?;

    Ok(Json(UserResponse::new(details.into())))
}

/// Create an account with any role
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = NewAccount,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(input): ApiJson<NewAccount>,
) -> ApiResult<(StatusCode, Json<UserResponse>)> {
    let account = state
        .users
        .create(&caller, input)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse::new(User::from_model(account, Vec::new()))),
    ))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AccountChanges,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<AccountChanges>,
) -> ApiResult<Json<UserResponse>> {
    let details = state
        .users
        .update(&caller, id, changes)
        .await
        .map_err(error_response)?;

    Ok(Json(UserResponse::new(details.into())))
}

/// Delete an account; projects it owns are kept
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = DeletedResponse),
        (status = 400, description = "Administrators cannot delete themselves", body = ErrorResponse),
        (status = 403, description = "Caller is not an administrator", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Json<DeletedResponse>> {
    state
        .users
        .delete(&caller, id)
        .await
        .map_err(error_response)?;

    Ok(Json(DeletedResponse::new()))
}
