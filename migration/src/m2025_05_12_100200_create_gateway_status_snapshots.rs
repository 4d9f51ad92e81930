//! Migration to create the gateway_status_snapshots table.
//!
//! Periodic gateway health reports: versions, geolocation, forwarder metrics.
//! Every data field is nullable; gateways report whatever they have.

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
                    .table(GatewayStatusSnapshots::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::GatewayId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::GatewayEui)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::StatusTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::BootTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::GatewayServerVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::FpgaVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::HalVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::Latitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::Longitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::Altitude)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayStatusSnapshots::Source).text().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Ip).text().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Txin).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Txok).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Lpps).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Rxin).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Rxok).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Rxfw).double().null())
                    .col(ColumnDef::new(GatewayStatusSnapshots::Ackr).double().null())
                    .col(
                        ColumnDef::new(GatewayStatusSnapshots::EventTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_gateway_status_gateway_event ON gateway_status_snapshots (gateway_id, event_time)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_gateway_status_gateway_event")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(GatewayStatusSnapshots::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum GatewayStatusSnapshots {
    Table,
    Id,
    GatewayId,
    GatewayEui,
    StatusTime,
    BootTime,
    GatewayServerVersion,
    FpgaVersion,
    HalVersion,
    Latitude,
    Longitude,
    Altitude,
    Source,
    Ip,
    Txin,
    Txok,
    Lpps,
    Rxin,
    Rxok,
    Rxfw,
    Ackr,
    EventTime,
}
