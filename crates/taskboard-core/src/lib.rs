//! Aggregate managers for taskboard
//!
//! [`ProjectManager`] owns the project lifecycle and its team list, [`TaskManager`]
//! owns tasks and their comments, and [`UserDirectory`] owns accounts. Each operation
//! resolves the target, asks the policy evaluator, and only then mutates. Steps that
//! touch more than one table run inside a single database transaction.

mod access;
pub mod error;
pub mod pagination;
mod patch;
pub mod projects;
pub mod tasks;
pub mod users;
pub mod validation;

pub use error::{FieldError, ServiceError, ServiceResult};
pub use pagination::{Page, PageRequest, SortSpec};
pub use projects::{
    NewProject, ProjectChanges, ProjectDetails, ProjectFilter, ProjectManager,
    DEFAULT_PROJECT_LIMIT, PROJECT_SORT_FIELDS,
};
pub use tasks::{
    derive_completed_at, NewTask, TaskChanges, TaskDetails, TaskFilter, TaskManager,
    DEFAULT_TASK_LIMIT, TASK_SORT_FIELDS,
};
pub use users::{
    require_admin, AccountChanges, NewAccount, UserDetails, UserDirectory, DEFAULT_USER_LIMIT,
    USER_SORT_FIELDS,
};

pub use taskboard_policy::{Caller, MemberRole, SystemRole};
