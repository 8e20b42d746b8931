//! Create `complaint` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Complaint::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Complaint::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Complaint::Title).text().not_null())
                    .col(ColumnDef::new(Complaint::Description).text().not_null())
                    .col(
                        ColumnDef::new(Complaint::PhotoUrl)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Complaint::AudioUrl)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Complaint::Location)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Complaint::Latitude).double())
                    .col(ColumnDef::new(Complaint::Longitude).double())
                    .col(
                        ColumnDef::new(Complaint::Status)
                            .string_len(32)
                            .not_null()
                            .default("Pending"),
                    )
                    .col(
                        ColumnDef::new(Complaint::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: created_at (newest-first listing)
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_created_at")
                    .table(Complaint::Table)
                    .col(Complaint::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: status (admin triage)
        manager
            .create_index(
                Index::create()
                    .name("idx_complaint_status")
                    .table(Complaint::Table)
                    .col(Complaint::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Complaint::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Complaint {
    Table,
    Id,
    Title,
    Description,
    PhotoUrl,
    AudioUrl,
    Location,
    Latitude,
    Longitude,
    Status,
    CreatedAt,
}
