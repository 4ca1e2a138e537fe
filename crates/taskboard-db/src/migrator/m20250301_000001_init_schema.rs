//! Users, projects, project team members and the user↔project link table

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ============================================================
        // 1. users
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::Name, 255).not_null())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(string_len(User::Role, 32).not_null().default("member"))
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 2. projects
        //
        // owner_id has no foreign key: deleting a user leaves the
        // projects it owns in place.
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(Project::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Project::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Project::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Project::Description).text().not_null())
                    .col(ColumnDef::new(Project::OwnerId).uuid().not_null())
                    .col(
                        ColumnDef::new(Project::Status)
                            .string_len(32)
                            .not_null()
                            .default("planning"),
                    )
                    .col(
                        ColumnDef::new(Project::Priority)
                            .string_len(32)
                            .not_null()
                            .default("medium"),
                    )
                    .col(ColumnDef::new(Project::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Project::DueDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Project::Tags).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Project::IsArchived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Project::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Project::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_owner_created")
                    .table(Project::Table)
                    .col(Project::OwnerId)
                    .col(Project::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_projects_status")
                    .table(Project::Table)
                    .col(Project::Status)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 3. project_members
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(ProjectMember::Table)
                    .if_not_exists()
                    .col(uuid(ProjectMember::ProjectId).not_null())
                    .col(uuid(ProjectMember::UserId).not_null())
                    .col(
                        string_len(ProjectMember::Role, 32)
                            .not_null()
                            .default("viewer"),
                    )
                    .col(
                        timestamp_with_time_zone(ProjectMember::JoinedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(ProjectMember::ProjectId)
                            .col(ProjectMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_members_project_id")
                            .from(ProjectMember::Table, ProjectMember::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_members_user_id")
                            .from(ProjectMember::Table, ProjectMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_project_members_user_id")
                    .table(ProjectMember::Table)
                    .col(ProjectMember::UserId)
                    .to_owned(),
            )
            .await?;

        // ============================================================
        // 4. user_projects
        // ============================================================
        manager
            .create_table(
                Table::create()
                    .table(UserProject::Table)
                    .if_not_exists()
                    .col(uuid(UserProject::UserId).not_null())
                    .col(uuid(UserProject::ProjectId).not_null())
                    .col(
                        timestamp_with_time_zone(UserProject::AddedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(UserProject::UserId)
                            .col(UserProject::ProjectId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_projects_user_id")
                            .from(UserProject::Table, UserProject::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_projects_project_id")
                            .from(UserProject::Table, UserProject::ProjectId)
                            .to(Project::Table, Project::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserProject::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ProjectMember::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Project::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await?;

        Ok(())
    }
}

// ============================================================
// Table identifiers
// ============================================================

#[derive(DeriveIden)]
pub(super) enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Role,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
pub(super) enum Project {
    #[sea_orm(iden = "projects")]
    Table,
    Id,
    Name,
    Description,
    OwnerId,
    Status,
    Priority,
    StartDate,
    DueDate,
    Tags,
    IsArchived,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ProjectMember {
    #[sea_orm(iden = "project_members")]
    Table,
    ProjectId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(DeriveIden)]
enum UserProject {
    #[sea_orm(iden = "user_projects")]
    Table,
    UserId,
    ProjectId,
    AddedAt,
}
