//! Database entities

pub mod project;
pub mod project_member;
pub mod task;
pub mod task_comment;
pub mod user;
pub mod user_project;

pub use project::Entity as Project;
pub use project_member::Entity as ProjectMember;
pub use task::Entity as Task;
pub use task_comment::Entity as TaskComment;
pub use user::Entity as User;
pub use user_project::Entity as UserProject;

pub mod prelude {
    pub use super::project::Entity as Project;
    pub use super::project_member::Entity as ProjectMember;
    pub use super::task::Entity as Task;
    pub use super::task_comment::Entity as TaskComment;
    pub use super::user::Entity as User;
    pub use super::user_project::Entity as UserProject;
}

/// List-valued columns are stored as JSON text
pub mod json_text {
    use serde::{de::DeserializeOwned, Serialize};
    use tracing::warn;

    pub fn encode<T: Serialize>(items: &[T]) -> String {
        serde_json::to_string(items).unwrap_or_else(|e| {
            warn!("Failed to encode list column, storing empty list: {}", e);
            "[]".to_string()
        })
    }

    /// Unreadable column text decodes as an empty list and is logged
    pub fn decode<T: DeserializeOwned>(raw: &str) -> Vec<T> {
        serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!(len = raw.len(), "Corrupt list column, reading as empty: {}", e);
            Vec::new()
        })
    }

}
