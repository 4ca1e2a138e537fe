//! Tasks

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::json_text;
pub use super::project::Priority;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[sea_orm(string_value = "todo")]
    Todo,

    #[sea_orm(string_value = "in-progress")]
    InProgress,

    #[sea_orm(string_value = "review")]
    Review,

    #[sea_orm(string_value = "done")]
    Done,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Checklist item embedded in a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// File reference attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub title: String,

    pub description: Option<String>,

    /// Parent project, fixed at creation
    pub project_id: Uuid,

    /// Creator, fixed at creation
    pub created_by: Uuid,

    pub assigned_to: Option<Uuid>,

    pub status: TaskStatus,

    pub priority: Priority,

    /// JSON array of task IDs
    pub dependencies: String,

    /// JSON array of [`Subtask`]
    pub subtasks: String,

    pub estimated_hours: Option<f64>,

    pub actual_hours: f64,

    pub start_date: Option<ChronoDateTimeUtc>,

    pub due_date: Option<ChronoDateTimeUtc>,

    /// Set iff `status` is `done`
    pub completed_at: Option<ChronoDateTimeUtc>,

    /// JSON array of [`Attachment`]
    pub attachments: String,

    /// JSON array of strings
    pub tags: String,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn dependency_list(&self) -> Vec<Uuid> {
        json_text::decode(&self.dependencies)
    }

    pub fn subtask_list(&self) -> Vec<Subtask> {
        json_text::decode(&self.subtasks)
    }

    pub fn attachment_list(&self) -> Vec<Attachment> {
        json_text::decode(&self.attachments)
    }

    pub fn tag_list(&self) -> Vec<String> {
        json_text::decode(&self.tags)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::project::Entity",
        from = "Column::ProjectId",
        to = "super::project::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Project,

    #[sea_orm(has_many = "super::task_comment::Entity")]
    Comments,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::task_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
