//! Migration to create the aggregation_checkpoints table.
//!
//! Persists the scheduler watermark so a restart resumes where the previous
//! run stopped instead of reprocessing all history. Updated in the same
//! transaction as each cycle's KPI writes.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AggregationCheckpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AggregationCheckpoints::Name)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AggregationCheckpoints::ProcessedTill)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AggregationCheckpoints::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(AggregationCheckpoints::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum AggregationCheckpoints {
    Table,
    Name,
    ProcessedTill,
    UpdatedAt,
}
