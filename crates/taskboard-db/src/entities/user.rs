//! User accounts

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use taskboard_policy::SystemRole;

/// User role in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum UserRole {
    #[sea_orm(string_value = "member")]
    Member,

    #[sea_orm(string_value = "admin")]
    Admin,
}

impl From<UserRole> for SystemRole {
    fn from(role: UserRole) -> Self {
        match role {
            UserRole::Member => SystemRole::Member,
            UserRole::Admin => SystemRole::Admin,
        }
    }
}

impl From<SystemRole> for UserRole {
    fn from(role: SystemRole) -> Self {
        match role {
            SystemRole::Member => UserRole::Member,
            SystemRole::Admin => UserRole::Admin,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub name: String,

    /// Lower-cased, unique
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub role: UserRole,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Projects the user belongs to (owned or joined)
    #[sea_orm(has_many = "super::user_project::Entity")]
    ProjectLinks,

    /// Team memberships
    #[sea_orm(has_many = "super::project_member::Entity")]
    Memberships,
}

impl Related<super::user_project::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProjectLinks.def()
    }
}

impl Related<super::project_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
