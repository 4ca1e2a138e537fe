//! Integration tests for the HTTP surface

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};
use taskboard_api::{models::*, ApiServer, ApiServerConfig};
use taskboard_core::NewAccount;
use tower::ServiceExt; // For `oneshot` method
use uuid::Uuid;

/// Helper to create an in-memory database with migrations applied
async fn create_test_db() -> DatabaseConnection {
    let db = taskboard_db::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    taskboard_db::migrate(&db)
        .await
        .expect("Failed to run migrations");

    db
}

fn test_config(allow_signup: bool) -> ApiServerConfig {
    ApiServerConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: "test-secret".to_string(),
        allow_signup,
        ..Default::default()
    }
}

async fn create_test_server() -> ApiServer {
    ApiServer::new(test_config(true), create_test_db().await)
}

/// Send a request and decode the JSON body
async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().uri(uri).method(method);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

/// Register an account and return its (id, token)
async fn signup(app: &Router, name: &str, email: &str) -> (Uuid, String) {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": name, "email": email, "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let auth: AuthResponse = serde_json::from_value(body).unwrap();
    (auth.data.id, auth.token)
}

async fn create_project(app: &Router, token: &str, name: &str) -> Uuid {
    let (status, body) = send(
        app,
        "POST",
        "/api/projects",
        Some(token),
        Some(json!({ "name": name, "description": "A test project" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);

    let project: ProjectResponse = serde_json::from_value(body).unwrap();
    project.data.id
}

async fn create_task(app: &Router, token: &str, project: Uuid, title: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/api/tasks",
        Some(token),
        Some(json!({ "project": project, "title": title })),
    )
    .await
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = create_test_server().await.build_router();

    for uri in ["/health", "/api/health"] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::OK);

        let health: HealthResponse = serde_json::from_value(body).unwrap();
        assert_eq!(health.status, "OK");
        assert!(!health.version.is_empty());
    }
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = create_test_server().await.build_router();
    let (user_id, _) = signup(&app, "Ada", "Ada@Example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let auth: AuthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(auth.data.id, user_id);
    assert_eq!(auth.data.email, "ada@example.com");
    assert_eq!(auth.data.role, taskboard_core::SystemRole::Member);

    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&auth.token), None).await;
    assert_eq!(status, StatusCode::OK);

    let me: UserResponse = serde_json::from_value(body).unwrap();
    assert!(me.success);
    assert_eq!(me.data.id, user_id);
    assert!(me.data.projects.is_empty());
}

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = create_test_server().await.build_router();

    let request = Request::builder()
        .uri("/api/auth/register")
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "Ada", "email": "ada@example.com", "password": "secret123" })
                .to_string(),
        ))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session_token="));
    assert!(cookie.contains("HttpOnly"));

    // The cookie alone authenticates
    let token_pair = cookie.split(';').next().unwrap().to_string();
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::COOKIE, token_pair)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_validation_and_duplicates() {
    let app = create_test_server().await.build_router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "A", "email": "nope", "password": "short" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.code.as_deref(), Some("VALIDATION_ERROR"));
    assert_eq!(error.details.map(|d| d.len()), Some(3));

    signup(&app, "Ada", "ada@example.com").await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Other", "email": "ada@example.com", "password": "secret123" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn test_register_disabled() {
    let app = ApiServer::new(test_config(false), create_test_db().await).build_router();

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "name": "Ada", "email": "ada@example.com", "password": "secret123" })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_wrong_password_is_generic() {
    let app = create_test_server().await.build_router();
    signup(&app, "Ada", "ada@example.com").await;

    let (wrong_pw, wrong_pw_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "wrong123" })),
    )
    .await;
    let (unknown, unknown_body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "nobody@example.com", "password": "secret123" })),
    )
    .await;

    assert_eq!(wrong_pw, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw_body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn test_update_password_issues_new_session() {
    let app = create_test_server().await.build_router();
    let (_, token) = signup(&app, "Ada", "ada@example.com").await;

    let (status, _) = send(
        &app,
        "PUT",
        "/api/auth/updatepassword",
        Some(&token),
        Some(json!({ "currentPassword": "wrong123", "newPassword": "changed456" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/auth/updatepassword",
        Some(&token),
        Some(json!({ "currentPassword": "secret123", "newPassword": "changed456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": "ada@example.com", "password": "changed456" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = create_test_server().await.build_router();

    for (method, uri) in [
        ("GET", "/api/projects"),
        ("GET", "/api/tasks"),
        ("GET", "/api/auth/me"),
        ("GET", "/api/users"),
    ] {
        let (status, body) = send(&app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        assert_eq!(body["success"], false);
    }

    let (status, _) = send(&app, "GET", "/api/projects", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_outsider_gets_forbidden_and_missing_gets_not_found() {
    let app = create_test_server().await.build_router();
    let (_, owner) = signup(&app, "Owner", "owner@example.com").await;
    let (_, outsider) = signup(&app, "Outsider", "outsider@example.com").await;
    let project = create_project(&app, &owner, "Secret plans").await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{}", project),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/projects/{}", Uuid::new_v4()),
        Some(&outsider),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Project not found");

    let (status, _) = create_task(&app, &outsider, project, "Sneaky task").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let app = create_test_server().await.build_router();
    let (_, token) = signup(&app, "Ada", "ada@example.com").await;

    let (status, body) = send(&app, "GET", "/api/projects/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_ID");

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(&token),
        Some(json!({ "name": "Ok name", "description": "desc", "status": "sleeping" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_BODY");

    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(&token),
        Some(json!({ "name": "ab", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, "GET", "/api/projects?limit=500", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = send(
        &app,
        "GET",
        "/api/projects?page=18446744073709551615",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, "GET", "/api/tasks?sort=-password", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_owner_viewer_task_lifecycle() {
    let app = create_test_server().await.build_router();
    let (owner_id, owner) = signup(&app, "Owner", "owner@example.com").await;
    let (member_id, member) = signup(&app, "Member", "member@example.com").await;

    // O creates P
    let (status, body) = send(
        &app,
        "POST",
        "/api/projects",
        Some(&owner),
        Some(json!({ "name": "Launch", "description": "Ship it" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let project: ProjectResponse = serde_json::from_value(body).unwrap();
    assert_eq!(project.data.owner, owner_id);
    let project_id = project.data.id;

    // O adds M as viewer
    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/projects/{}/team", project_id),
        Some(&owner),
        Some(json!({ "userId": member_id, "role": "viewer" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let project: ProjectResponse = serde_json::from_value(body).unwrap();
    assert_eq!(project.data.team.len(), 1);
    assert_eq!(project.data.team[0].role, taskboard_core::MemberRole::Viewer);

    // M creates a task under P
    let (status, body) = create_task(&app, &member, project_id, "Write docs").await;
    assert_eq!(status, StatusCode::CREATED);
    let task: TaskResponse = serde_json::from_value(body).unwrap();
    assert_eq!(task.data.created_by, member_id);
    let task_id = task.data.id;

    // M can read and comment but not delete
    let (status, _) = send(&app, "GET", &format!("/api/tasks/{}", task_id), Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/api/tasks/{}/comments", task_id),
        Some(&member),
        Some(json!({ "text": "On it" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let task: TaskResponse = serde_json::from_value(body).unwrap();
    assert_eq!(task.data.comments.len(), 1);
    assert_eq!(task.data.comments[0].user, member_id);

    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}", task_id),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    // O deletes it
    let (status, body) = send(
        &app,
        "DELETE",
        &format!("/api/tasks/{}", task_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true, "data": {} }));

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/tasks?project={}", project_id),
        Some(&owner),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tasks: TaskList = serde_json::from_value(body).unwrap();
    assert_eq!(tasks.total, 0);
    assert!(tasks.data.is_empty());
}

#[tokio::test]
async fn test_duplicate_member_and_idempotent_removal() {
    let app = create_test_server().await.build_router();
    let (_, owner) = signup(&app, "Owner", "owner@example.com").await;
    let (member_id, member) = signup(&app, "Member", "member@example.com").await;
    let project_id = create_project(&app, &owner, "Team work").await;
    let team_uri = format!("/api/projects/{}/team", project_id);

    let (status, _) = send(&app, "POST", &team_uri, Some(&owner), Some(json!({ "userId": member_id }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", &team_uri, Some(&owner), Some(json!({ "userId": member_id }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "CONFLICT");

    let (_, body) = send(&app, "GET", "/api/auth/me", Some(&member), None).await;
    assert_eq!(body["data"]["projects"], json!([project_id]));

    let member_uri = format!("{}/{}", team_uri, member_id);
    for _ in 0..2 {
        let (status, body) = send(&app, "DELETE", &member_uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["team"], json!([]));
    }

    let (_, body) = send(&app, "GET", "/api/auth/me", Some(&member), None).await;
    assert_eq!(body["data"]["projects"], json!([]));
}

#[tokio::test]
async fn test_status_patch_tracks_completion() {
    let app = create_test_server().await.build_router();
    let (_, owner) = signup(&app, "Owner", "owner@example.com").await;
    let project_id = create_project(&app, &owner, "Tracking").await;
    let (_, body) = create_task(&app, &owner, project_id, "Finish me").await;
    let task_id = body["data"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/tasks/{}/status", task_id);

    let (status, body) = send(&app, "PATCH", &status_uri, Some(&owner), Some(json!({ "status": "done" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["completedAt"].is_string());

    let (_, body) = send(&app, "PATCH", &status_uri, Some(&owner), Some(json!({ "status": "todo" }))).await;
    assert!(body["data"]["completedAt"].is_null());

    let (status, _) = send(&app, "PATCH", &status_uri, Some(&owner), Some(json!({ "status": "finished" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_project_list_envelope() {
    let app = create_test_server().await.build_router();
    let (_, owner) = signup(&app, "Owner", "owner@example.com").await;
    for name in ["Alpha", "Bravo", "Charlie"] {
        create_project(&app, &owner, name).await;
    }

    let (status, body) = send(&app, "GET", "/api/projects?limit=2&sort=name", Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);

    let list: ProjectList = serde_json::from_value(body).unwrap();
    assert_eq!(list.count, 2);
    assert_eq!(list.total, 3);
    assert_eq!(list.pagination.pages, 2);
    assert_eq!(list.data[0].name, "Alpha");
    assert_eq!(list.data[1].name, "Bravo");
}

#[tokio::test]
async fn test_user_directory_is_admin_only() {
    let server = create_test_server().await;
    let state = server.state();
    let app = server.build_router();

    let admin = state
        .users
        .create_admin(NewAccount {
            name: "Root".to_string(),
            email: "root@example.com".to_string(),
            password: "admin123".to_string(),
            role: None,
        })
        .await
        .unwrap();
    let admin_token = state
        .jwt
        .issue_session(admin.id, "admin", state.token_ttl)
        .unwrap()
        .token;

    let (member_id, member) = signup(&app, "Member", "member@example.com").await;

    let (status, body) = send(&app, "GET", "/api/users", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "User role 'member' is not authorized to access this route"
    );

    let (status, body) = send(&app, "GET", "/api/users", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let users: UserList = serde_json::from_value(body).unwrap();
    assert_eq!(users.total, 2);

    let (status, body) = send(
        &app,
        "POST",
        "/api/users",
        Some(&admin_token),
        Some(json!({ "name": "Second Admin", "email": "second@example.com", "password": "admin456", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{}", admin.id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "DELETE",
        &format!("/api/users/{}", member_id),
        Some(&admin_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The deleted member's token no longer authenticates
    let (status, body) = send(&app, "GET", "/api/auth/me", Some(&member), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_unknown_route_returns_json_not_found() {
    let app = create_test_server().await.build_router();

    let (status, body) = send(&app, "GET", "/api/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}
