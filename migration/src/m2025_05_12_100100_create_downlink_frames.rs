//! Migration to create the downlink_frames table.

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
                    .table(DownlinkFrames::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DownlinkFrames::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DownlinkFrames::GatewayId).text().not_null())
                    .col(ColumnDef::new(DownlinkFrames::GatewayEui).text().null())
                    .col(ColumnDef::new(DownlinkFrames::RawPayload).text().null())
                    .col(
                        ColumnDef::new(DownlinkFrames::Bandwidth)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DownlinkFrames::SpreadingFactor)
                            .integer()
                            .null(),
                    )
                    .col(ColumnDef::new(DownlinkFrames::CodingRate).text().null())
                    .col(ColumnDef::new(DownlinkFrames::Frequency).text().null())
                    .col(
                        ColumnDef::new(DownlinkFrames::ConcentratorTimestamp)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(DownlinkFrames::TxPower).double().null())
                    .col(
                        ColumnDef::new(DownlinkFrames::InvertPolarization)
                            .boolean()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(DownlinkFrames::EventTime)
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
                "CREATE INDEX IF NOT EXISTS idx_downlink_frames_gateway_event ON downlink_frames (gateway_id, event_time)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_downlink_frames_gateway_event")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(DownlinkFrames::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DownlinkFrames {
    Table,
    Id,
    GatewayId,
    GatewayEui,
    RawPayload,
    Bandwidth,
    SpreadingFactor,
    CodingRate,
    Frequency,
    ConcentratorTimestamp,
    TxPower,
    InvertPolarization,
    EventTime,
}
