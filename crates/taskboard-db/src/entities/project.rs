//! Projects

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::json_text;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[sea_orm(string_value = "planning")]
    Planning,

    #[sea_orm(string_value = "active")]
    Active,

    #[sea_orm(string_value = "on-hold")]
    OnHold,

    #[sea_orm(string_value = "completed")]
    Completed,

    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Priority shared by projects and tasks
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[sea_orm(string_value = "low")]
    Low,

    #[sea_orm(string_value = "medium")]
    Medium,

    #[sea_orm(string_value = "high")]
    High,

    #[sea_orm(string_value = "urgent")]
    Urgent,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    pub description: String,

    /// Owning user, fixed at creation
    pub owner_id: Uuid,

    pub status: ProjectStatus,

    pub priority: Priority,

    pub start_date: Option<ChronoDateTimeUtc>,

    pub due_date: Option<ChronoDateTimeUtc>,

    /// JSON array of strings
    pub tags: String,

    pub is_archived: bool,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn tag_list(&self) -> Vec<String> {
        json_text::decode(&self.tags)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::project_member::Entity")]
    Members,

    #[sea_orm(has_many = "super::task::Entity")]
    Tasks,

    #[sea_orm(has_many = "super::user_project::Entity")]
    UserLinks,
}

impl Related<super::project_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl Related<super::task::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tasks.def()
    }
}

impl Related<super::user_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserLinks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
