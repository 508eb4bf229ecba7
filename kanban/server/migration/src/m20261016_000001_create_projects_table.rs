use sea_orm_migration::prelude::*;
use sea_orm_migration::schema::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Projects {
    Table,
    Id,
    Name,
    Description,
    Status,
    StartedAt,
    CompletedAt,
    Archived,
}

#[derive(DeriveIden)]
enum HistoryEntries {
    Table,
    Id,
    ProjectId,
    Status,
    RecordedAt,
}

const DEFAULT_STATUS: &str = "pendente";
const FK_HISTORY_ENTRIES_TO_PROJECTS: &str = "fk-history_entries-project_id";
const IDX_HISTORY_ENTRIES_PROJECT_ID: &str = "idx-history_entries-project_id";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Projects::Table)
                    .if_not_exists()
                    .col(pk_auto(Projects::Id))
                    .col(string_len(Projects::Name, 100))
                    .col(text(Projects::Description))
                    .col(string_len(Projects::Status, 20).default(DEFAULT_STATUS))
                    .col(timestamp_with_time_zone_null(Projects::StartedAt))
                    .col(timestamp_with_time_zone_null(Projects::CompletedAt))
                    .col(boolean(Projects::Archived).default(false))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HistoryEntries::Table)
                    .if_not_exists()
                    .col(pk_auto(HistoryEntries::Id))
                    .col(integer(HistoryEntries::ProjectId))
                    .col(string_len(HistoryEntries::Status, 20))
                    .col(
                        timestamp_with_time_zone(HistoryEntries::RecordedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name(FK_HISTORY_ENTRIES_TO_PROJECTS)
                            .from(HistoryEntries::Table, HistoryEntries::ProjectId)
                            .to(Projects::Table, Projects::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::NoAction),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name(IDX_HISTORY_ENTRIES_PROJECT_ID)
                    .table(HistoryEntries::Table)
                    .col(HistoryEntries::ProjectId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name(IDX_HISTORY_ENTRIES_PROJECT_ID)
                    .table(HistoryEntries::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(HistoryEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Projects::Table).to_owned())
            .await
    }
}
