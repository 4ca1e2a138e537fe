//! Caller identity as resolved by the authentication layer

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// System-wide role of a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum SystemRole {
    /// Regular account
    #[default]
    Member,
    /// Administrator, overrides every project and task check
    Admin,
}

impl SystemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemRole::Member => "member",
            SystemRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for SystemRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SystemRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(SystemRole::Member),
            "admin" => Ok(SystemRole::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Authenticated caller of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    /// User ID
    pub id: Uuid,
    /// System role
    pub role: SystemRole,
}

impl Caller {
    pub fn new(id: Uuid, role: SystemRole) -> Self {
        Self { id, role }
    }

    pub fn member(id: Uuid) -> Self {
        Self::new(id, SystemRole::Member)
    }

    pub fn admin(id: Uuid) -> Self {
        Self::new(id, SystemRole::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == SystemRole::Admin
    }
}
