//! Migration to create the device_gateway_relations table.
//!
//! Maps a non-durable device address seen at a gateway to the durable device
//! identity, carrying the last frame counter observed for that identity.
//! A dev_addr reused by another device yields an additional row, which is why
//! resolution picks the closest last_f_cnt instead of assuming uniqueness.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceGatewayRelations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::DevAddr)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::GatewayId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::DeviceId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::ApplicationId)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::LastFCnt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceGatewayRelations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_relations_addr_gateway ON device_gateway_relations (dev_addr, gateway_id)".to_string(),
            ))
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_relations_gateway_device ON device_gateway_relations (gateway_id, device_id)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_relations_addr_gateway").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_relations_gateway_device").to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(DeviceGatewayRelations::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum DeviceGatewayRelations {
    Table,
    Id,
    DevAddr,
    GatewayId,
    DeviceId,
    ApplicationId,
    LastFCnt,
    UpdatedAt,
}
