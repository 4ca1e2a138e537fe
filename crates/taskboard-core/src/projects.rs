//! Project Aggregate Manager
//!
//! Owns the project lifecycle, its team list and the per-user project links. The
//! project's task list is read from `tasks.project_id`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use serde::Deserialize;
use taskboard_db::entities::project::{Priority, ProjectStatus};
use taskboard_db::entities::{
    json_text, project, project_member, task, task_comment, user, user_project,
};
use taskboard_policy::{Caller, MemberRole, ProjectAction};
use tracing::{debug, info};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::access::{load_team, ProjectState};
use crate::error::{ServiceError, ServiceResult};
use crate::pagination::{Page, PageRequest};
use crate::patch;
use crate::validation::{project_description, project_name};

/// Fields a project list may be sorted by
pub const PROJECT_SORT_FIELDS: &[&str] = &[
    "createdAt",
    "updatedAt",
    "name",
    "status",
    "priority",
    "dueDate",
    "startDate",
];

pub const DEFAULT_PROJECT_LIMIT: u64 = 10;

/// Attributes for a new project
///
/// The owner is always the caller; an `owner` field in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    #[serde(default)]
    #[validate(custom(function = "project_name"))]
    pub name: String,
    #[serde(default)]
    #[validate(custom(function = "project_description"))]
    pub description: String,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial project update
///
/// There is no `owner`, `team` or `tasks` field: those are dropped during decoding.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectChanges {
    #[validate(custom(function = "project_name"))]
    pub name: Option<String>,
    #[validate(custom(function = "project_description"))]
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "patch::nullable")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
    pub is_archived: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Archived projects are hidden unless set
    pub include_archived: bool,
}

/// A project with its team and task IDs
#[derive(Debug, Clone)]
pub struct ProjectDetails {
    pub project: project::Model,
    pub team: Vec<project_member::Model>,
    pub task_ids: Vec<Uuid>,
}

impl ProjectDetails {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.team.iter().any(|m| m.user_id == user_id)
    }
}

#[derive(Clone)]
pub struct ProjectManager {
    db: DatabaseConnection,
}

impl ProjectManager {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Projects the caller owns or is a team member of
    ///
    /// Admins get no extra visibility here; their override only applies to single
    /// resource checks.
    pub async fn list(
        &self,
        caller: &Caller,
        filter: &ProjectFilter,
        request: &PageRequest,
    ) -> ServiceResult<Page<ProjectDetails>> {
        let memberships = Query::select()
            .column(project_member::Column::ProjectId)
            .from(project_member::Entity)
            .and_where(project_member::Column::UserId.eq(caller.id))
            .to_owned();

        let mut condition = Condition::all().add(
            Condition::any()
                .add(project::Column::OwnerId.eq(caller.id))
                .add(project::Column::Id.in_subquery(memberships)),
        );

        if let Some(status) = filter.status {
            condition = condition.add(project::Column::Status.eq(status));
        }
        if let Some(priority) = filter.priority {
            condition = condition.add(project::Column::Priority.eq(priority));
        }
        if !filter.include_archived {
            condition = condition.add(project::Column::IsArchived.eq(false));
        }

        let order = if request.sort.descending {
            Order::Desc
        } else {
            Order::Asc
        };

        let paginator = project::Entity::find()
            .filter(condition)
            .order_by(sort_column(&request.sort.field), order)
            .order_by_asc(project::Column::Id)
            .paginate(&self.db, request.limit);

        let index = request.index()?;
        let total = paginator.num_items().await?;
        let projects = paginator.fetch_page(index).await?;
        let items = load_details(&self.db, projects).await?;

        debug!(
            user_id = %caller.id,
            total,
            page = request.page,
            "Listed projects"
        );

        Ok(Page {
            items,
            total,
            page: request.page,
            limit: request.limit,
        })
    }

    pub async fn get(&self, caller: &Caller, id: Uuid) -> ServiceResult<ProjectDetails> {
        let state = ProjectState::load(&self.db, id).await?;
        state.check(caller, ProjectAction::Read, None)?;

        let task_ids = load_task_ids(&self.db, id).await?;
        Ok(ProjectDetails {
            project: state.project,
            team: state.team,
            task_ids,
        })
    }

    /// Create a project owned by the caller and link it into the caller's list
    pub async fn create(&self, caller: &Caller, input: NewProject) -> ServiceResult<ProjectDetails> {
        input.validate()?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let project = project::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description.trim().to_string()),
            owner_id: Set(caller.id),
            status: Set(input.status.unwrap_or(ProjectStatus::Planning)),
            priority: Set(input.priority.unwrap_or(Priority::Medium)),
            start_date: Set(Some(input.start_date.unwrap_or(now))),
            due_date: Set(input.due_date),
            tags: Set(json_text::encode(&input.tags)),
            is_archived: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        link_user(&txn, caller.id, project.id).await?;
        txn.commit().await?;

        info!(project_id = %project.id, owner_id = %caller.id, "Project created");

        Ok(ProjectDetails {
            project,
            team: Vec::new(),
            task_ids: Vec::new(),
        })
    }

    pub async fn update(
        &self,
        caller: &Caller,
        id: Uuid,
        changes: ProjectChanges,
    ) -> ServiceResult<ProjectDetails> {
        let state = ProjectState::load(&self.db, id).await?;
        state.check(caller, ProjectAction::Update, None)?;
        changes.validate()?;

        let mut active: project::ActiveModel = state.project.into();
        if let Some(name) = changes.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = changes.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(status) = changes.status {
            active.status = Set(status);
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority);
        }
        if let Some(start_date) = changes.start_date {
            active.start_date = Set(start_date);
        }
        if let Some(due_date) = changes.due_date {
            active.due_date = Set(due_date);
        }
        if let Some(tags) = changes.tags {
            active.tags = Set(json_text::encode(&tags));
        }
        if let Some(is_archived) = changes.is_archived {
            active.is_archived = Set(is_archived);
        }
        active.updated_at = Set(Utc::now());

        let project = active.update(&self.db).await?;
        info!(project_id = %id, user_id = %caller.id, "Project updated");

        let task_ids = load_task_ids(&self.db, id).await?;
        Ok(ProjectDetails {
            project,
            team: state.team,
            task_ids,
        })
    }

    /// Delete a project and everything hanging off it
    ///
    /// Comments, tasks, team entries and every user's link to the project go in the
    /// same transaction as the project row.
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> ServiceResult<()> {
        let state = ProjectState::load(&self.db, id).await?;
        state.check(caller, ProjectAction::Delete, None)?;

        let txn = self.db.begin().await?;

        let task_ids = load_task_ids(&txn, id).await?;
        if !task_ids.is_empty() {
            task_comment::Entity::delete_many()
                .filter(task_comment::Column::TaskId.is_in(task_ids.clone()))
                .exec(&txn)
                .await?;
        }

        task::Entity::delete_many()
            .filter(task::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?;

        project_member::Entity::delete_many()
            .filter(project_member::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?;

        let unlinked = user_project::Entity::delete_many()
            .filter(user_project::Column::ProjectId.eq(id))
            .exec(&txn)
            .await?
            .rows_affected;

        project::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            project_id = %id,
            user_id = %caller.id,
            tasks_removed = task_ids.len(),
            users_unlinked = unlinked,
            "Project deleted"
        );

        Ok(())
    }

    /// Add `user_id` to the team with `role`
    ///
    /// Fails with `NotFound` if the user does not exist and `Conflict` if they are
    /// already on the team.
    pub async fn add_team_member(
        &self,
        caller: &Caller,
        id: Uuid,
        user_id: Uuid,
        role: MemberRole,
    ) -> ServiceResult<ProjectDetails> {
        let state = ProjectState::load(&self.db, id).await?;
        state.check(caller, ProjectAction::ManageTeam, None)?;

        let txn = self.db.begin().await?;

        if user::Entity::find_by_id(user_id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("User"));
        }

        if project_member::Entity::find_by_id((id, user_id))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(already_member());
        }

        project_member::ActiveModel {
            project_id: Set(id),
            user_id: Set(user_id),
            role: Set(role.into()),
            joined_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|err| {
            if ServiceError::is_unique_violation(&err) {
                already_member()
            } else {
                ServiceError::from(err)
            }
        })?;

        link_user(&txn, user_id, id).await?;
        txn.commit().await?;

        info!(project_id = %id, member_id = %user_id, ?role, "Team member added");

        self.reload(state.project).await
    }

    /// Remove `user_id` from the team; a no-op if they are not on it
    pub async fn remove_team_member(
        &self,
        caller: &Caller,
        id: Uuid,
        user_id: Uuid,
    ) -> ServiceResult<ProjectDetails> {
        let state = ProjectState::load(&self.db, id).await?;
        state.check(caller, ProjectAction::ManageTeam, None)?;

        let txn = self.db.begin().await?;

        let removed = project_member::Entity::delete_by_id((id, user_id))
            .exec(&txn)
            .await?
            .rows_affected;

        // The owner keeps the project in their list regardless of team entries
        if user_id != state.project.owner_id {
            user_project::Entity::delete_by_id((user_id, id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        if removed > 0 {
            info!(project_id = %id, member_id = %user_id, "Team member removed");
        } else {
            debug!(project_id = %id, member_id = %user_id, "Team member was not on the team");
        }

        self.reload(state.project).await
    }

    async fn reload(&self, project: project::Model) -> ServiceResult<ProjectDetails> {
        let team = load_team(&self.db, project.id).await?;
        let task_ids = load_task_ids(&self.db, project.id).await?;
        Ok(ProjectDetails {
            project,
            team,
            task_ids,
        })
    }
}

fn already_member() -> ServiceError {
    ServiceError::Conflict("User is already a team member".to_string())
}

fn sort_column(field: &str) -> project::Column {
    match field {
        "updatedAt" => project::Column::UpdatedAt,
        "name" => project::Column::Name,
        "status" => project::Column::Status,
        "priority" => project::Column::Priority,
        "dueDate" => project::Column::DueDate,
        "startDate" => project::Column::StartDate,
        _ => project::Column::CreatedAt,
    }
}

/// Add a project to a user's list if it is not there yet
pub(crate) async fn link_user<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    project_id: Uuid,
) -> Result<(), DbErr> {
    let existing = user_project::Entity::find_by_id((user_id, project_id))
        .one(conn)
        .await?;

    if existing.is_none() {
        user_project::ActiveModel {
            user_id: Set(user_id),
            project_id: Set(project_id),
            added_at: Set(Utc::now()),
        }
        .insert(conn)
        .await?;
    }

    Ok(())
}

async fn load_task_ids<C: ConnectionTrait>(conn: &C, project_id: Uuid) -> ServiceResult<Vec<Uuid>> {
    Ok(task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .filter(task::Column::ProjectId.eq(project_id))
        .order_by_asc(task::Column::CreatedAt)
        .order_by_asc(task::Column::Id)
        .into_tuple::<Uuid>()
        .all(conn)
        .await?)
}

/// Attach teams and task IDs to a page of projects with two queries
async fn load_details<C: ConnectionTrait>(
    conn: &C,
    projects: Vec<project::Model>,
) -> ServiceResult<Vec<ProjectDetails>> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

    let members = project_member::Entity::find()
        .filter(project_member::Column::ProjectId.is_in(ids.clone()))
        .order_by_asc(project_member::Column::JoinedAt)
        .order_by_asc(project_member::Column::UserId)
        .all(conn)
        .await?;

    let tasks: Vec<(Uuid, Uuid)> = task::Entity::find()
        .select_only()
        .column(task::Column::Id)
        .column(task::Column::ProjectId)
        .filter(task::Column::ProjectId.is_in(ids))
        .order_by_asc(task::Column::CreatedAt)
        .order_by_asc(task::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;

    let mut teams: HashMap<Uuid, Vec<project_member::Model>> = HashMap::new();
    for member in members {
        teams.entry(member.project_id).or_default().push(member);
    }

    let mut task_ids: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (task_id, project_id) in tasks {
        task_ids.entry(project_id).or_default().push(task_id);
    }

    Ok(projects
        .into_iter()
        .map(|project| ProjectDetails {
            team: teams.remove(&project.id).unwrap_or_default(),
            task_ids: task_ids.remove(&project.id).unwrap_or_default(),
            project,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_limits() {
        let input = NewProject {
            name: "ab".to_string(),
            description: String::new(),
            ..Default::default()
        };

        match input.validate().map_err(ServiceError::from) {
            Err(ServiceError::Validation(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["description", "name"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_changes_only_check_present_fields() {
        assert!(ProjectChanges::default().validate().is_ok());

        let too_long = ProjectChanges {
            description: Some("x".repeat(501)),
            ..Default::default()
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_owner_field_is_dropped_from_changes() {
        let changes: ProjectChanges = serde_json::from_str(&format!(
            r#"{{"name":"Renamed","owner":"{}","dueDate":null}}"#,
            Uuid::new_v4()
        ))
        .unwrap();

        assert_eq!(changes.name.as_deref(), Some("Renamed"));
        assert_eq!(changes.due_date, Some(None));
        assert_eq!(changes.start_date, None);
    }

    #[test]
    fn test_status_uses_kebab_case() {
        let input: NewProject = serde_json::from_str(
            r#"{"name":"Apollo","description":"Moon","status":"on-hold","priority":"urgent"}"#,
        )
        .unwrap();

        assert_eq!(input.status, Some(ProjectStatus::OnHold));
        assert_eq!(input.priority, Some(Priority::Urgent));
    }

    #[test]
    fn test_sort_columns() {
        assert!(matches!(sort_column("name"), project::Column::Name));
        assert!(matches!(sort_column("createdAt"), project::Column::CreatedAt));
    }
}
