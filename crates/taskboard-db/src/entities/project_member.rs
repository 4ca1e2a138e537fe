//! Project team membership

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use taskboard_policy::{Member, MemberRole};

/// Role of a user in a project team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum TeamRole {
    #[sea_orm(string_value = "viewer")]
    Viewer,

    #[sea_orm(string_value = "editor")]
    Editor,

    #[sea_orm(string_value = "admin")]
    Admin,
}

impl From<TeamRole> for MemberRole {
    fn from(role: TeamRole) -> Self {
        match role {
            TeamRole::Viewer => MemberRole::Viewer,
            TeamRole::Editor => MemberRole::Editor,
            TeamRole::Admin => MemberRole::Admin,
        }
    }
}

impl From<MemberRole> for TeamRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Viewer => TeamRole::Viewer,
            MemberRole::Editor => TeamRole::Editor,
            MemberRole::Admin => TeamRole::Admin,
        }
    }
}

/// One user per project: `(project_id, user_id)` is the primary key
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub project_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,

    pub role: TeamRole,

    pub joined_at: ChronoDateTimeUtc,
}

impl Model {
    /// Policy view of this membership
    pub fn as_member(&self) -> Member {
        Member {
            user_id: self.user_id,
            role: self.role.into(),
        }
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

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
