//! Account session endpoints

use axum::{
    extract::State,
    http::{header, StatusCode},
    Extension, Json,
};
use std::sync::Arc;
use taskboard_core::{AccountChanges, NewAccount, ServiceError};
use taskboard_db::entities::user;
use taskboard_policy::Caller;
use tracing::{debug, info};

use crate::error::{error_response, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::SESSION_COOKIE;
use crate::models::{
    AuthResponse, ErrorResponse, LoginRequest, LogoutResponse, UpdatePasswordRequest, User,
    UserResponse,
};
use crate::AppState;

type CookieHeader = [(header::HeaderName, String); 1];

fn session_cookie(token: &str, max_age_secs: i64) -> CookieHeader {
    [(
        header::SET_COOKIE,
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, max_age_secs
        ),
    )]
}

/// Mint a session for `account` and build the response body plus cookie
async fn start_session(
    state: &AppState,
    account: user::Model,
) -> ApiResult<(CookieHeader, Json<AuthResponse>)> {
    let caller = Caller::new(account.id, account.role.into());
    let session = state
        .jwt
        .issue_session(caller.id, caller.role.as_str(), state.token_ttl)
        .map_err(|e| error_response(ServiceError::Internal(e.to_string())))?;

    let details = state.users.profile(&caller).await.map_err(error_response)?;

    Ok((
        session_cookie(&session.token, state.token_ttl.num_seconds()),
        Json(AuthResponse {
            success: true,
            token: session.token,
            expires_at: session.expires_at,
            data: User::from(details),
        }),
    ))
}

/// Create a member account and log it in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = NewAccount,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorResponse),
        (status = 403, description = "Registration is disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<NewAccount>,
) -> ApiResult<(StatusCode, CookieHeader, Json<AuthResponse>)> {
    if !state.allow_signup {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(
                "Public registration is disabled",
                "SIGNUP_DISABLED",
            )),
        ));
    }

    let account = state.users.register(input).await.map_err(error_response)?;
    let (cookie, body) = start_session(&state, account).await?;

    Ok((StatusCode::CREATED, cookie, body))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 400, description = "Email or password missing", body = ErrorResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<(CookieHeader, Json<AuthResponse>)> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(error_response(ServiceError::invalid(
            "email",
            "Please provide an email and password",
        )));
    }

    let account = state
        .users
        .authenticate(&req.email, &req.password)
        .await
        .map_err(error_response)?;

    info!(user_id = %account.id, "User logged in");
    start_session(&state, account).await
}

/// Clear the session cookie
///
/// Tokens are stateless, so a copied token stays valid until it expires.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse)
    ),
    tag = "auth"
)]
pub async fn logout() -> (CookieHeader, Json<LogoutResponse>) {
    debug!("Clearing session cookie");

    (
        session_cookie("", 0),
        Json(LogoutResponse {
            success: true,
            message: "Logged out".to_string(),
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn get_current_user(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> ApiResult<Json<UserResponse>> {
    let details = state.users.profile(&caller).await.map_err(error_response)?;

    Ok(Json(UserResponse::new(details.into())))
}

/// Change the caller's name or email
#[utoipa::path(
    put,
    path = "/api/auth/updatedetails",
    request_body = AccountChanges,
    responses(
        (status = 200, description = "Account updated", body = UserResponse),
        (status = 400, description = "Validation failed or email already registered", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_details(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(changes): ApiJson<AccountChanges>,
) -> ApiResult<Json<UserResponse>> {
    let details = state
        .users
        .update_profile(&caller, changes)
        .await
        .map_err(error_response)?;

    Ok(Json(UserResponse::new(details.into())))
}

/// Replace the caller's password and issue a fresh session
#[utoipa::path(
    put,
    path = "/api/auth/updatepassword",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = AuthResponse),
        (status = 400, description = "New password too weak", body = ErrorResponse),
        (status = 401, description = "Current password is incorrect", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<(CookieHeader, Json<AuthResponse>)> {
    let account = state
        .users
        .change_password(&caller, &req.current_password, &req.new_password)
        .await
        .map_err(error_response)?;

    start_session(&state, account).await
}
