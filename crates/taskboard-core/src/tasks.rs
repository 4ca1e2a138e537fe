//! Task Aggregate Manager
//!
//! Every task check goes through the parent project's owner and team. Status changes
//! recompute `completed_at` with [`derive_completed_at`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use taskboard_db::entities::task::{Attachment, Priority, Subtask, TaskStatus};
use taskboard_db::entities::{json_text, project, project_member, task, task_comment};
use taskboard_policy::{Caller, TaskAction};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::ProjectState;
use crate::error::{ServiceError, ServiceResult};
use crate::pagination::{Page, PageRequest};
use crate::patch;
use crate::validation::{comment_text, task_title};

/// Fields a task list may be sorted by
pub const TASK_SORT_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "title",
    "status",
    "priority",
    "dueDate",
    "startDate",
];

pub const DEFAULT_TASK_LIMIT: u64 = 20;

/// New value of `completed_at` after a status change
///
/// - entering `done` from another status stamps `now`
/// - `done` again while already done keeps the existing stamp
/// - any other explicit status clears it
/// - no status in the request leaves it alone
pub fn derive_completed_at(
    current_status: TaskStatus,
    current_completed_at: Option<DateTime<Utc>>,
    requested: Option<TaskStatus>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match requested {
        None => current_completed_at,
        Some(TaskStatus::Done) if current_status == TaskStatus::Done => {
            current_completed_at.or(Some(now))
        }
        Some(TaskStatus::Done) => Some(now),
        Some(_) => None,
    }
}

/// Attributes for a new task
///
/// `createdBy` is always the caller; a value in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    /// Parent project ID
    #[validate(required(message = "Project is required"))]
    pub project: Option<Uuid>,
    #[serde(default)]
    #[validate(custom(function = "task_title"))]
    pub title: String,
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub dependencies: Vec<Uuid>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[validate(range(min = 0.0, message = "Estimated hours must be a positive number"))]
    pub estimated_hours: Option<f64>,
    #[validate(range(min = 0.0, message = "Actual hours must be a positive number"))]
    pub actual_hours: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial task update
///
/// `project` and `createdBy` are not fields here, so they never change.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskChanges {
    #[validate(custom(function = "task_title"))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>)]
    #[validate(length(max = 1000, message = "Description cannot exceed 1000 characters"))]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>, format = Uuid)]
    pub assigned_to: Option<Option<Uuid>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub dependencies: Option<Vec<Uuid>>,
    pub subtasks: Option<Vec<Subtask>>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<f64>)]
    #[validate(range(min = 0.0, message = "Estimated hours must be a positive number"))]
    pub estimated_hours: Option<Option<f64>>,
    #[validate(range(min = 0.0, message = "Actual hours must be a positive number"))]
    pub actual_hours: Option<f64>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub attachments: Option<Vec<Attachment>>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub project: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Inclusive lower bound on `due_date`
    pub due_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `due_date`
    pub due_to: Option<DateTime<Utc>>,
}

#[derive(Validate)]
struct NewComment {
    #[validate(custom(function = "comment_text"))]
    text: String,
}

/// A task with its comments, oldest first
#[derive(Debug, Clone)]
pub struct TaskDetails {
    pub task: task::Model,
    pub comments: Vec<task_comment::Model>,
}

#[derive(Clone)]
pub struct TaskManager {
    db: DatabaseConnection,
}

impl TaskManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Tasks in projects the caller owns or is a team member of
    pub async fn list(
        &self,
        caller: &Caller,
        filter: &TaskFilter,
        request: &PageRequest,
    ) -> ServiceResult<Page<TaskDetails>> {
        let index = request.index()?;
        let accessible = self.accessible_projects(caller).await?;
        let scope: Vec<Uuid> = match filter.project {
            Some(project_id) => accessible.into_iter().filter(|id| *id == project_id).collect(),
            None => accessible,
        };

        if scope.is_empty() {
            debug!(user_id = %caller.id, "No accessible projects for task listing");
            return Ok(Page::empty(request));
        }

        let mut condition = Condition::all().add(task::Column::ProjectId.is_in(scope));
        if let Some(assignee) = filter.assigned_to {
            condition = condition.add(task::Column::AssignedTo.eq(assignee));
        }
        if let Some(status) = filter.status {
            condition = condition.add(task::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            condition = condition.add(task::Column::Priority.eq(priority));
        }
        if let Some(from) = filter.due_from {
            condition = condition.add(task::Column::DueDate.gte(from));
        }
        if let Some(to) = filter.due_to {
            condition = condition.add(task::Column::DueDate.lte(to));
        }

        let order = if request.sort.descending {
            Order::Desc
        } else {
            Order::Asc
        };

        let paginator = task::Entity::find()
            .filter(condition)
            .order_by(sort_column(&request.sort.field), order)
            .order_by_asc(task::Column::Id)
            .paginate(&self.db, request.limit);

        let total = paginator.num_items().await?;
        let tasks = paginator.fetch_page(index).await?;
        let items = attach_comments(&self.db, tasks).await?;

        debug!(user_id = %caller.id, total, page = request.page, "Listed tasks");

        Ok(Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<TaskDetails> {
        let task = find_task(&self.db, id).await?;
        let state = ProjectState::load(&self.db, task.project_id).await?;
        state.check(caller, TaskAction::Read, task.assigned_to)?;

        self.with_comments(task).await
    }

    /// Create a task in an existing project the caller can access
    pub async fn create(&self, caller: &Caller, input: NewTask) -> ServiceResult<TaskDetails> {
        input.validate()?;
        let project_id = input
            .project
            .ok_or_else(|| ServiceError::invalid("project", "Project is required"))?;

        let txn = self.db.begin().await?;
        let state = ProjectState::load(&txn, project_id).await?;
        state.check(caller, TaskAction::Create, None)?;

        let now = Utc::now();
        let status = input.status.unwrap_or(TaskStatus::Todo);

        let task = task::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description),
            project_id: Set(project_id),
            created_by: Set(caller.id),
            assigned_to: Set(input.assigned_to),
            status: Set(status),
            priority: Set(input.priority.unwrap_or(Priority::Medium)),
            dependencies: Set(json_text::encode(&input.dependencies)),
            subtasks: Set(json_text::encode(&input.subtasks)),
            estimated_hours: Set(input.estimated_hours),
            actual_hours: Set(input.actual_hours.unwrap_or(0.0)),
            start_date: Set(input.start_date),
            due_date: Set(input.due_date),
            completed_at: Set(derive_completed_at(
                TaskStatus::Todo,
                None,
                Some(status),
                now,
            )),
            attachments: Set(json_text::encode(&input.attachments)),
            tags: Set(json_text::encode(&input.tags)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        info!(task_id = %task.id, project_id = %project_id, user_id = %caller.id, "Task created");

        Ok(TaskDetails {
            task,
            comments: Vec::new(),
        })
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: TaskChanges,
    ) -> ServiceResult<TaskDetails> {
        let task = find_task(&self.db, id).await?;
        let state = ProjectState::load(&self.db, task.project_id).await?;
        state.check(caller, TaskAction::Update, task.assigned_to)?;
        changes.validate()?;

        let now = Utc::now();
        let completed_at =
            derive_completed_at(task.status, task.completed_at, changes.status, now);

        let mut active: task::ActiveModel = task.into();
        if let Some(title) = changes.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(assigned_to) = changes.assigned_to {
            active.assigned_to = Set(assigned_to);
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(dependencies) = changes.dependencies {
            active.dependencies = Set(json_text::encode(&dependencies));
        }
        if let Some(subtasks) = changes.subtasks {
            active.subtasks = Set(json_text::encode(&subtasks));
        }
        if let Some(estimated_hours) = changes.estimated_hours {
            active.estimated_hours = Set(estimated_hours);
        }
        if let Some(actual_hours) = changes.actual_hours {
            active.actual_hours = Set(actual_hours);
        }
        if let Some(start_date) = changes.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(due_date) = changes.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(attachments) = changes.attachments {
            active.attachments = Set(json_text::encode(&attachments));
        }
        if let Some(tags) = changes.tags {
            active.tags = Set(json_text::encode(&tags));
        }
        active.completed_at = Set(completed_at);
        active.updated_at = Set(now);

        let task = active.update(&self.db).await?;
        info!(task_id = %id, user_id = %caller.id, "Task updated");

        self.with_comments(task).await
    }

    /// Delete a task and its comments
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<()> {
        let txn = self.db.begin().await?;

        let task = find_task(&txn, id).await?;
        let state = ProjectState::load(&txn, task.project_id).await?;
        state.check(caller, TaskAction::Delete, task.assigned_to)?;

        task_comment::Entity::delete_many()
            .filter(task_comment::Column::TaskId.eq(id))
            .exec(&txn)
            .await?;
        task::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;

        info!(task_id = %id, project_id = %task.project_id, user_id = %caller.id, "Task deleted");
        Ok(())
    }

    /// Append a comment; existing comments are never edited
    pub async fn add_comment(
        &self,
        caller: &Caller,
        id: Uuid,
        text: &str,
    ) -> ServiceResult<TaskDetails> {
        let task = find_task(&self.db, id).await?;
        let state = ProjectState::load(&self.db, task.project_id).await?;
        state.check(caller, TaskAction::Comment, task.assigned_to)?;

        NewComment {
            text: text.to_string(),
        }
        .validate()?;

        task_comment::ActiveModel {
            id: Set(Uuid::new_v4()),
            task_id: Set(id),
            user_id: Set(caller.id),
            text: Set(text.trim().to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!(task_id = %id, user_id = %caller.id, "Comment added");

        self.with_comments(task).await
    }

    /// Change only the status; the assignee may do this without project access
    pub async fn update_status(
        &self,
        caller: &Caller,
        id: Uuid,
        status: TaskStatus,
    ) -> ServiceResult<TaskDetails> {
        let task = find_task(&self.db, id).await?;
        let state = ProjectState::load(&self.db, task.project_id).await?;
        state.check(caller, TaskAction::UpdateStatus, task.assigned_to)?;

        let now = Utc::now();
        let completed_at = derive_completed_at(task.status, task.completed_at, Some(status), now);

        let mut active: task::ActiveModel = task.into();
        active.status = Set(status);
        active.completed_at = Set(completed_at);
        active.updated_at = Set(now);

        let task = active.update(&self.db).await?;
        info!(task_id = %id, user_id = %caller.id, ?status, "Task status updated");

        self.with_comments(task).await
    }

    /// Owned projects followed by joined ones
    async fn accessible_projects(&self, caller: &Caller) -> ServiceResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = project::Entity::find()
            .select_only()
            .column(project::Column::Id)
            .filter(project::Column::OwnerId.eq(caller.id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;

        let joined: Vec<Uuid> = project_member::Entity::find()
            .select_only()
            .column(project_member::Column::ProjectId)
            .filter(project_member::Column::UserId.eq(caller.id))
            .into_tuple::<Uuid>()
            .all(&self.db)
            .await?;

        for id in joined {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        Ok(ids)
    }

    async fn with_comments(&self, task: task::Model) -> ServiceResult<TaskDetails> {
        let comments = task_comment::Entity::find()
            .filter(task_comment::Column::TaskId.eq(task.id))
            .order_by_asc(task_comment::Column::CreatedAt)
            .order_by_asc(task_comment::Column::Id)
            .all(&self.db)
            .await?;

        Ok(TaskDetails { task, comments })
    }
}

async fn find_task<C: ConnectionTrait>(conn: &C, id: Uuid) -> ServiceResult<task::Model> {
    task::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Task"))
}

fn sort_column(field: &str) -> task::Column {
    match field {
        "updatedAt" => task::Column::UpdatedAt,
        "title" => task::Column::Title,
        "status" => task::Column::Status,
        "priority" => task::Column::Priority,
        "dueDate" => task::Column::DueDate,
        "startDate" => task::Column::StartDate,
        _ => task::Column::CreatedAt,
    }
}

async fn attach_comments<C: ConnectionTrait>(
    conn: &C,
    tasks: Vec<task::Model>,
) -> ServiceResult<Vec<TaskDetails>> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let comments = task_comment::Entity::find()
        .filter(task_comment::Column::TaskId.is_in(ids))
        .order_by_asc(task_comment::Column::CreatedAt)
        .order_by_asc(task_comment::Column::Id)
        .all(conn)
        .await?;

    let mut by_task: HashMap<Uuid, Vec<task_comment::Model>> = HashMap::new();
    for comment in comments {
        by_task.entry(comment.task_id).or_default().push(comment);
    }

    Ok(tasks
        .into_iter()
        .map(|task| TaskDetails {
            comments: by_task.remove(&task.id).unwrap_or_default(),
            task,
        })
        .collect())
}
