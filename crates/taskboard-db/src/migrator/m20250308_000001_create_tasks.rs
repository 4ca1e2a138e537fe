//! Tasks and their comments

use sea_orm_migration::prelude::*;

use super::m20250301_000001_init_schema::Project;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Task::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Task::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Task::Description).text())
                    .col(ColumnDef::new(Task::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Task::CreatedBy).uuid().not_null())
                    .col(ColumnDef::new(Task::AssignedTo).uuid())
                    .col(
                        ColumnDef::new(Task::Status)
                            .string_len(32)
                            .not_null()
                            .default("todo"),
                    )
                    .col(
                        ColumnDef::new(Task::Priority)
                            .string_len(32)
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(Task::Dependencies)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Task::Subtasks).text().not_null().default("[]"))
                    .col(ColumnDef::new(Task::EstimatedHours).double())
                    .col(
                        ColumnDef::new(Task::ActualHours)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Task::StartDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Task::DueDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Task::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Task::Attachments)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(ColumnDef::new(Task::Tags).text().not_null().default("[]"))
                    .col(
                        ColumnDef::new(Task::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Task::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_project_id")
                            .from(Task::Table, Task::ProjectId)
                            .to(Project::Table, Project::Id)
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
                    .name("idx_tasks_project_status")
                    .table(Task::Table)
                    .col(Task::ProjectId)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_assigned_status")
                    .table(Task::Table)
                    .col(Task::AssignedTo)
                    .col(Task::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_due_date")
                    .table(Task::Table)
                    .col(Task::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_created_at")
                    .table(Task::Table)
                    .col(Task::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(TaskComment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(TaskComment::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(TaskComment::TaskId).uuid().not_null())
                    .col(ColumnDef::new(TaskComment::UserId).uuid().not_null())
                    .col(ColumnDef::new(TaskComment::Text).text().not_null())
                    .col(
                        ColumnDef::new(TaskComment::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_task_comments_task_id")
                            .from(TaskComment::Table, TaskComment::TaskId)
                            .to(Task::Table, Task::Id)
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
                    .name("idx_task_comments_task_id")
                    .table(TaskComment::Table)
                    .col(TaskComment::TaskId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TaskComment::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Task::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Task {
    #[sea_orm(iden = "tasks")]
    Table,
    Id,
    Title,
    Description,
    ProjectId,
    CreatedBy,
    AssignedTo,
    Status,
    Priority,
    Dependencies,
    Subtasks,
    EstimatedHours,
    ActualHours,
    StartDate,
    DueDate,
    CompletedAt,
    Attachments,
    Tags,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TaskComment {
    #[sea_orm(iden = "task_comments")]
    Table,
    Id,
    TaskId,
    UserId,
    Text,
    CreatedAt,
}
