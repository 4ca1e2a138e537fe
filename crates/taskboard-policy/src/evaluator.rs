//! Decision table for project and task actions
//!
//! Rules, in precedence order:
//! 1. A caller with the `admin` system role is always allowed.
//! 2. Project update, delete and team management require the project owner.
//! 3. Project read is also open to any team member.
//! 4. Task read, create, comment and update require project-level access
//!    (owner or any team member).
//! 5. Task delete requires the owner or a team member whose role is `admin` or `editor`.
//! 6. Task status update requires project-level access or being the task's assignee.
//! 7. Everything else is denied.
//!
//! Team roles are only consulted by rule 5. Viewers may still update and comment on
//! tasks through rule 4.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::caller::Caller;

/// Role of a user inside a project team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    /// Read access (and, per rule 4, task edits)
    #[default]
    Viewer,
    /// May additionally delete tasks
    Editor,
    /// May additionally delete tasks
    Admin,
}

impl MemberRole {
    /// Whether this team role may delete tasks
    pub fn can_delete_tasks(&self) -> bool {
        matches!(self, MemberRole::Editor | MemberRole::Admin)
    }
}

/// One team membership entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub user_id: Uuid,
    pub role: MemberRole,
}

/// Ownership snapshot of a project, the only state the rules look at
#[derive(Debug, Clone, Copy)]
pub struct ProjectGuard<'a> {
    pub owner_id: Uuid,
    pub team: &'a [Member],
}

impl<'a> ProjectGuard<'a> {
    pub fn new(owner_id: Uuid, team: &'a [Member]) -> Self {
        Self { owner_id, team }
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn membership(&self, user_id: Uuid) -> Option<&'a Member> {
        self.team.iter().find(|m| m.user_id == user_id)
    }

    /// Owner or any team member
    pub fn has_access(&self, user_id: Uuid) -> bool {
        self.is_owner(user_id) || self.membership(user_id).is_some()
    }
}

/// The resource an action targets
///
/// Task actions are always evaluated against the parent project; `assignee` is only
/// meaningful for task actions.
#[derive(Debug, Clone, Copy)]
pub struct Resource<'a> {
    pub project: ProjectGuard<'a>,
    pub assignee: Option<Uuid>,
}

impl<'a> Resource<'a> {
    pub fn project(project: ProjectGuard<'a>) -> Self {
        Self {
            project,
            assignee: None,
        }
    }

    pub fn task(project: ProjectGuard<'a>, assignee: Option<Uuid>) -> Self {
        Self { project, assignee }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectAction {
    Read,
    Update,
    Delete,
    ManageTeam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskAction {
    Read,
    Create,
    Comment,
    Update,
    Delete,
    UpdateStatus,
}

/// Tagged action passed to the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Project(ProjectAction),
    Task(TaskAction),
}

impl Action {
    /// Message returned to a caller denied this action
    pub fn denial_message(&self) -> &'static str {
        match self {
            Action::Project(ProjectAction::Read) => "Not authorized to access this project",
            Action::Project(ProjectAction::Update) => "Not authorized to update this project",
            Action::Project(ProjectAction::Delete) => "Not authorized to delete this project",
            Action::Project(ProjectAction::ManageTeam) => "Not authorized to manage team members",
            Action::Task(TaskAction::Read) => "Not authorized to access this task",
            Action::Task(TaskAction::Create) => "Not authorized to create tasks in this project",
            Action::Task(TaskAction::Comment) => "Not authorized to comment on this task",
            Action::Task(TaskAction::Update) | Action::Task(TaskAction::UpdateStatus) => {
                "Not authorized to update this task"
            }
            Action::Task(TaskAction::Delete) => "Not authorized to delete this task",
        }
    }
}

impl From<ProjectAction> for Action {
    fn from(action: ProjectAction) -> Self {
        Action::Project(action)
    }
}

impl From<TaskAction> for Action {
    fn from(action: TaskAction) -> Self {
        Action::Task(action)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    pub fn is_allowed(&self) -> bool {
        *self == Decision::Allow
    }
}

/// Why an action was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenied {
    /// No caller identity was supplied
    #[error("Not authorized to access this route")]
    Unauthenticated,

    /// The caller is known but the rules deny the action
    #[error("{0}")]
    Forbidden(&'static str),
}

/// Evaluate the decision table
pub fn decide(caller: &Caller, resource: &Resource<'_>, action: Action) -> Decision {
    if caller.is_admin() {
        return Decision::Allow;
    }

    let project = &resource.project;
    let allowed = match action {
        Action::Project(ProjectAction::Read) => project.has_access(caller.id),
        Action::Project(ProjectAction::Update)
        | Action::Project(ProjectAction::Delete)
        | Action::Project(ProjectAction::ManageTeam) => project.is_owner(caller.id),
        Action::Task(TaskAction::Read)
        | Action::Task(TaskAction::Create)
        | Action::Task(TaskAction::Comment)
        | Action::Task(TaskAction::Update) => project.has_access(caller.id),
        Action::Task(TaskAction::Delete) => {
            project.is_owner(caller.id)
                || project
                    .membership(caller.id)
                    .is_some_and(|m| m.role.can_delete_tasks())
        }
        Action::Task(TaskAction::UpdateStatus) => {
            project.has_access(caller.id) || resource.assignee == Some(caller.id)
        }
    };

    Decision::from_bool(allowed)
}

/// Evaluate the decision table for a possibly anonymous caller
pub fn authorize(
    caller: Option<&Caller>,
    resource: &Resource<'_>,
    action: impl Into<Action>,
) -> Result<(), AccessDenied> {
    let action = action.into();
    let caller = caller.ok_or(AccessDenied::Unauthenticated)?;

    match decide(caller, resource, action) {
        Decision::Allow => Ok(()),
        Decision::Deny => Err(AccessDenied::Forbidden(action.denial_message())),
    }
}
