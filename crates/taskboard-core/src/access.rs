//! Loads the ownership state of a project and runs it through the evaluator

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use taskboard_db::entities::{project, project_member};
use taskboard_policy::{authorize, Action, Caller, Member, ProjectGuard, Resource};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceResult};

/// A project row plus its team, ordered by join time
#[derive(Debug, Clone)]
pub(crate) struct ProjectState {
    pub project: project::Model,
    pub team: Vec<project_member::Model>,
}

impl ProjectState {
    pub async fn load<C: ConnectionTrait>(conn: &C, project_id: Uuid) -> ServiceResult<Self> {
        let project = project::Entity::find_by_id(project_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Project"))?;

        let team = load_team(conn, project_id).await?;

        Ok(Self { project, team })
    }

    /// Ask the evaluator; `assignee` only matters for task actions
    pub fn check(
        &self,
        caller: &Caller,
        action: impl Into<Action>,
        assignee: Option<Uuid>,
    ) -> ServiceResult<()> {
        let action = action.into();
        let members: Vec<Member> = self.team.iter().map(|m| m.as_member()).collect();
        let resource = Resource {
            project: ProjectGuard::new(self.project.owner_id, &members),
            assignee,
        };

        authorize(Some(caller), &resource, action).map_err(|denied| {
            warn!(
                user_id = %caller.id,
                project_id = %self.project.id,
                ?action,
                "Access denied"
            );
            ServiceError::from(denied)
        })
    }
}

pub(crate) async fn load_team<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> ServiceResult<Vec<project_member::Model>> {
    Ok(project_member::Entity::find()
        .filter(project_member::Column::ProjectId.eq(project_id))
        .order_by_asc(project_member::Column::JoinedAt)
        .order_by_asc(project_member::Column::UserId)
        .all(conn)
        .await?)
}
