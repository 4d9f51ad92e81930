//! Migration to create the monitored_gateways table.
//!
//! The working set of gateway ids the pipeline tracks. Membership is managed
//! by the orchestration layer, not by this service.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MonitoredGateways::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonitoredGateways::GatewayId)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MonitoredGateways::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum MonitoredGateways {
    Table,
    GatewayId,
}
