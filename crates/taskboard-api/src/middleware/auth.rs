//! JWT Authentication Middleware
//!
//! Extracts the session token from the `session_token` cookie or an
//! `Authorization: Bearer` header, validates it, loads the account it names and
//! inserts a [`Caller`] into the request extensions.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use std::sync::Arc;
use taskboard_policy::Caller;
use tracing::{debug, warn};

use crate::error::error_response;
use crate::models::ErrorResponse;
use crate::AppState;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session_token";

fn unauthorized(message: impl Into<String>, code: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse::new(message, code)),
    )
}

fn token_from_cookie(request: &Request) -> Option<String> {
    let cookies = request.headers().get(header::COOKIE)?.to_str().ok()?;

    cookies
        .split(';')
        .map(|c| c.trim())
        .find_map(|c| c.strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authentication middleware for protected routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - Both cookie and Authorization header are missing
/// - Token is malformed, expired or signed with another secret
/// - Token type is not "session"
/// - The account named by the token no longer exists
///
/// The caller's role is read from the stored account, not from the token.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // Cookie first (browser clients), then the Authorization header (API clients)
    let token = match token_from_cookie(&request) {
        Some(token) => token,
        None => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| unauthorized("Not authorized to access this route", "MISSING_AUTH"))?;

            auth_header
                .strip_prefix("Bearer ")
                .ok_or_else(|| {
                    unauthorized(
                        "Invalid Authorization header format. Expected 'Bearer <token>'",
                        "INVALID_AUTH_FORMAT",
                    )
                })?
                .to_string()
        }
    };

    let claims = state.jwt.validate(&token).map_err(|e| {
        debug!("Rejected session token: {}", e);
        unauthorized("Invalid or expired token", "INVALID_TOKEN")
    })?;

    if !claims.is_session() {
        return Err(unauthorized(
            format!(
                "Invalid token type '{}'. Expected 'session' token",
                claims.token_type.as_deref().unwrap_or("none")
            ),
            "INVALID_TOKEN_TYPE",
        ));
    }

    let user_id = claims
        .user_id()
        .map_err(|e| unauthorized(e.to_string(), "INVALID_TOKEN"))?;

    let account = state
        .users
        .find(user_id)
        .await
        .map_err(error_response)?
        .ok_or_else(|| {
            warn!(%user_id, "Session token for a deleted account");
            unauthorized("User not found", "USER_NOT_FOUND")
        })?;

    let caller = Caller::new(account.id, account.role.into());
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
