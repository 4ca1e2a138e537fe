pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use std::{future::Future, net::SocketAddr, sync::Arc, time::Instant};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use taskboard_auth::JwtValidator;
use taskboard_core::{ProjectManager, TaskManager, UserDirectory};

use crate::models::ErrorResponse;

/// Application state shared across handlers
pub struct AppState {
    pub projects: ProjectManager,
    pub tasks: TaskManager,
    pub users: UserDirectory,
    /// Issues and validates session tokens
    pub jwt: JwtValidator,
    /// Lifetime of a newly issued session
    pub token_ttl: chrono::Duration,
    pub allow_signup: bool,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: &ApiServerConfig) -> Self {
        Self {
            projects: ProjectManager::new(db.clone()),
            tasks: TaskManager::new(db.clone()),
            users: UserDirectory::new(db),
            jwt: JwtValidator::for_sessions(config.jwt_secret.as_bytes()),
            token_ttl: config.token_ttl,
            allow_signup: config.allow_signup,
            started_at: Instant::now(),
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taskboard API",
        version = "0.1.0",
        description = "REST API for projects, teams and tasks with per-project access control"
    ),
    paths(
        handlers::health::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::get_current_user,
        handlers::auth::update_details,
        handlers::auth::update_password,
        handlers::projects::list_projects,
        handlers::projects::get_project,
        handlers::projects::create_project,
        handlers::projects::update_project,
        handlers::projects::delete_project,
        handlers::projects::add_team_member,
        handlers::projects::remove_team_member,
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
        handlers::tasks::add_comment,
        handlers::tasks::update_task_status,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::Pagination,
            models::Empty,
            models::DeletedResponse,
            models::HealthResponse,
            models::TeamMember,
            models::Project,
            models::ProjectResponse,
            models::ProjectList,
            models::AddTeamMemberRequest,
            models::Comment,
            models::Task,
            models::TaskResponse,
            models::TaskList,
            models::AddCommentRequest,
            models::UpdateStatusRequest,
            models::User,
            models::UserResponse,
            models::UserList,
            models::LoginRequest,
            models::UpdatePasswordRequest,
            models::AuthResponse,
            models::LogoutResponse,
            taskboard_core::FieldError,
            taskboard_core::NewProject,
            taskboard_core::ProjectChanges,
            taskboard_core::NewTask,
            taskboard_core::TaskChanges,
            taskboard_core::NewAccount,
            taskboard_core::AccountChanges,
            taskboard_core::SystemRole,
            taskboard_core::MemberRole,
            taskboard_db::entities::project::ProjectStatus,
            taskboard_db::entities::project::Priority,
            taskboard_db::entities::task::TaskStatus,
            taskboard_db::entities::task::Subtask,
            taskboard_db::entities::task::Attachment,
        )
    ),
    tags(
        (name = "auth", description = "Registration, login and the caller's own account"),
        (name = "projects", description = "Projects and their teams"),
        (name = "tasks", description = "Tasks, comments and status changes"),
        (name = "users", description = "User directory (administrators only)"),
        (name = "system", description = "System health endpoints")
    )
)]
struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, allows localhost development origins)
    pub cors_origins: Option<Vec<String>>,
    /// HMAC secret for session tokens
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Whether `POST /api/auth/register` is open
    pub allow_signup: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: String::new(),
            token_ttl: chrono::Duration::hours(720),
            allow_signup: true,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    pub fn new(config: ApiServerConfig, db: DatabaseConnection) -> Self {
        let state = Arc::new(AppState::new(db, &config));

        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/health", get(handlers::health::health_check))
            .route("/api/health", get(handlers::health::health_check))
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login))
            .route("/api/auth/logout", post(handlers::auth::logout))
            .with_state(self.state.clone());

        // PROTECTED routes (require a session token)
        let protected_router = Router::new()
            .route("/api/auth/me", get(handlers::auth::get_current_user))
            .route("/api/auth/updatedetails", put(handlers::auth::update_details))
            .route(
                "/api/auth/updatepassword",
                put(handlers::auth::update_password),
            )
            .route(
                "/api/projects",
                get(handlers::projects::list_projects).post(handlers::projects::create_project),
            )
            .route(
                "/api/projects/{id}",
                get(handlers::projects::get_project)
                    .put(handlers::projects::update_project)
                    .delete(handlers::projects::delete_project),
            )
            .route(
                "/api/projects/{id}/team",
                post(handlers::projects::add_team_member),
            )
            .route(
                "/api/projects/{id}/team/{user_id}",
                delete(handlers::projects::remove_team_member),
            )
            .route(
                "/api/tasks",
                get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
            )
            .route(
                "/api/tasks/{id}",
                get(handlers::tasks::get_task)
                    .put(handlers::tasks::update_task)
                    .delete(handlers::tasks::delete_task),
            )
            .route("/api/tasks/{id}/comments", post(handlers::tasks::add_comment))
            .route(
                "/api/tasks/{id}/status",
                patch(handlers::tasks::update_task_status),
            )
            .route(
                "/api/users",
                get(handlers::users::list_users).post(handlers::users::create_user),
            )
            .route(
                "/api/users/{id}",
                get(handlers::users::get_user)
                    .put(handlers::users::update_user)
                    .delete(handlers::users::delete_user),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi creates the route for /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router)
            .fallback(route_not_found);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    /// Cookie auth needs credentials, which rules out a wildcard origin
    fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true);

        match &self.config.cors_origins {
            Some(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| match HeaderValue::from_str(origin) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!("Ignoring invalid CORS origin '{}'", origin);
                            None
                        }
                    })
                    .collect();
                layer.allow_origin(AllowOrigin::list(origins))
            }
            None => layer.allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
                    || origin_str.starts_with("https://localhost:")
                    || origin_str.starts_with("https://127.0.0.1:")
            })),
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start the API server and drain in-flight requests once `signal` resolves
    pub async fn start_with_shutdown<F>(self, signal: F) -> Result<(), anyhow::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        info!("API server stopped");
        Ok(())
    }
}

async fn route_not_found() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Route not found", "NOT_FOUND")),
    )
}
