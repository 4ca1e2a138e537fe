use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskboard_core::{FieldError, Page, ProjectDetails, TaskDetails, UserDetails};
use taskboard_db::entities::project::{Priority, ProjectStatus};
use taskboard_db::entities::task::{Attachment, Subtask, TaskStatus};
use taskboard_db::entities::{project_member, task_comment, user};
use taskboard_policy::{MemberRole, SystemRole};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Field-level validation messages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: &str) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: Some(code.to_string()),
            details: None,
        }
    }
}

/// Page position returned with every list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub pages: u64,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            limit: page.limit,
            pages: page.pages(),
        }
    }
}

/// Empty `data` object for deletions
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct Empty {}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeletedResponse {
    pub success: bool,
    pub data: Empty,
}

impl DeletedResponse {
    pub fn new() -> Self {
        Self {
            success: true,
            data: Empty::default(),
        }
    }
}

impl Default for DeletedResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Service health
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "OK" when the process is serving
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started
    pub uptime: u64,
    pub version: String,
}

// ============================================================================
// Project Models
// ============================================================================

/// Team membership entry
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    /// Member user ID
    pub user: Uuid,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl From<project_member::Model> for TeamMember {
    fn from(member: project_member::Model) -> Self {
        Self {
            user: member.user_id,
            role: member.role.into(),
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Owner user ID, fixed at creation
    pub owner: Uuid,
    pub team: Vec<TeamMember>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    /// Task IDs in creation order
    pub tasks: Vec<Uuid>,
    pub tags: Vec<String>,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectDetails> for Project {
    fn from(details: ProjectDetails) -> Self {
        let tags = details.project.tag_list();
        let project = details.project;

        Self {
            id: project.id,
            name: project.name,
            description: project.description,
            owner: project.owner_id,
            team: details.team.into_iter().map(TeamMember::from).collect(),
            status: project.status,
            priority: project.priority,
            start_date: project.start_date,
            due_date: project.due_date,
            tasks: details.task_ids,
            tags,
            is_archived: project.is_archived,
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
    pub success: bool,
    pub data: Project,
}

impl ProjectResponse {
    pub fn new(details: ProjectDetails) -> Self {
        Self {
            success: true,
            data: details.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectList {
    pub success: bool,
    /// Items on this page
    pub count: usize,
    /// Items across all pages
    pub total: u64,
    pub pagination: Pagination,
    pub data: Vec<Project>,
}

impl From<Page<ProjectDetails>> for ProjectList {
    fn from(page: Page<ProjectDetails>) -> Self {
        let pagination = Pagination::from(&page);
        let data: Vec<Project> = page.items.into_iter().map(Project::from).collect();

        Self {
            success: true,
            count: data.len(),
            total: page.total,
            pagination,
            data,
        }
    }
}

/// Project list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    /// 1-based page (default 1)
    pub page: Option<String>,
    /// Page size, 1-100 (default 10)
    pub limit: Option<String>,
    /// Sort field, prefix with `-` for descending (default `-createdAt`)
    pub sort: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Include archived projects (default false)
    pub include_archived: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddTeamMemberRequest {
    pub user_id: Uuid,
    /// Defaults to `viewer`
    #[serde(default)]
    pub role: Option<MemberRole>,
}

// ============================================================================
// Task Models
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    /// Author user ID
    pub user: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<task_comment::Model> for Comment {
    fn from(comment: task_comment::Model) -> Self {
        Self {
            id: comment.id,
            user: comment.user_id,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Parent project ID
    pub project: Uuid,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub dependencies: Vec<Uuid>,
    pub subtasks: Vec<Subtask>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set iff status is `done`
    pub completed_at: Option<DateTime<Utc>>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskDetails> for Task {
    fn from(details: TaskDetails) -> Self {
        let task = details.task;

        Self {
            dependencies: task.dependency_list(),
            subtasks: task.subtask_list(),
            attachments: task.attachment_list(),
            tags: task.tag_list(),
            id: task.id,
            title: task.title,
            description: task.description,
            project: task.project_id,
            created_by: task.created_by,
            assigned_to: task.assigned_to,
            status: task.status,
            priority: task.priority,
            estimated_hours: task.estimated_hours,
            actual_hours: task.actual_hours,
            start_date: task.start_date,
            due_date: task.due_date,
            completed_at: task.completed_at,
            comments: details.comments.into_iter().map(Comment::from).collect(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub success: bool,
    pub data: Task,
}

impl TaskResponse {
    pub fn new(details: TaskDetails) -> Self {
        Self {
            success: true,
            data: details.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskList {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub pagination: Pagination,
    pub data: Vec<Task>,
}

impl From<Page<TaskDetails>> for TaskList {
    fn from(page: Page<TaskDetails>) -> Self {
        let pagination = Pagination::from(&page);
        let data: Vec<Task> = page.items.into_iter().map(Task::from).collect();

        Self {
            success: true,
            count: data.len(),
            total: page.total,
            pagination,
            data,
        }
    }
}

/// Task list filters
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    /// 1-based page (default 1)
    pub page: Option<String>,
    /// Page size, 1-100 (default 20)
    pub limit: Option<String>,
    /// Sort field, prefix with `-` for descending (default `-createdAt`)
    pub sort: Option<String>,
    pub project: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Inclusive lower bound on the due date (RFC 3339)
    pub due_date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the due date (RFC 3339)
    pub due_date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

// ============================================================================
// Account Models
// ============================================================================

/// Account as returned by the API; the password hash never leaves the server
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: SystemRole,
    /// Projects the user owns or has joined
    pub projects: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn from_model(account: user::Model, projects: Vec<Uuid>) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role.into(),
            projects,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

impl From<UserDetails> for User {
    fn from(details: UserDetails) -> Self {
        Self::from_model(details.user, details.project_ids)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub data: User,
}

impl UserResponse {
    pub fn new(user: User) -> Self {
        Self {
            success: true,
            data: user,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub success: bool,
    pub count: usize,
    pub total: u64,
    pub pagination: Pagination,
    pub data: Vec<User>,
}

impl From<Page<UserDetails>> for UserList {
    fn from(page: Page<UserDetails>) -> Self {
        let pagination = Pagination::from(&page);
        let data: Vec<User> = page.items.into_iter().map(User::from).collect();

        Self {
            success: true,
            count: data.len(),
            total: page.total,
            pagination,
            data,
        }
    }
}

/// User directory paging
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Session issued by register, login and password change
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    /// Session JWT, also set as the `session_token` cookie
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub data: User,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}
