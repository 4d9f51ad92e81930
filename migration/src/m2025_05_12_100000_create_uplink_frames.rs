//! Migration to create the uplink_frames table.
//!
//! One row per physical-layer reception of one LoRaWAN frame at one gateway.
//! Rows sharing (dev_addr, gateway_id, f_cnt) are replicas of the same frame,
//! which is the replication signal the reconciler and KPI pipeline consume.

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
                    .table(UplinkFrames::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UplinkFrames::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UplinkFrames::DevAddr).text().null())
                    .col(ColumnDef::new(UplinkFrames::DeviceId).text().null())
                    .col(ColumnDef::new(UplinkFrames::ApplicationId).text().null())
                    .col(ColumnDef::new(UplinkFrames::GatewayId).text().not_null())
                    .col(ColumnDef::new(UplinkFrames::GatewayEui).text().null())
                    .col(ColumnDef::new(UplinkFrames::MType).text().null())
                    .col(ColumnDef::new(UplinkFrames::FCnt).big_integer().null())
                    .col(ColumnDef::new(UplinkFrames::FPort).integer().null())
                    .col(ColumnDef::new(UplinkFrames::FCtrlAdr).boolean().null())
                    .col(ColumnDef::new(UplinkFrames::JoinEui).text().null())
                    .col(ColumnDef::new(UplinkFrames::DevEui).text().null())
                    .col(ColumnDef::new(UplinkFrames::DevNonce).text().null())
                    .col(ColumnDef::new(UplinkFrames::RawPayload).text().not_null())
                    .col(ColumnDef::new(UplinkFrames::FrmPayload).text().null())
                    .col(
                        ColumnDef::new(UplinkFrames::PayloadSize)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UplinkFrames::Bandwidth).big_integer().null())
                    .col(
                        ColumnDef::new(UplinkFrames::SpreadingFactor)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UplinkFrames::CodingRate).text().null())
                    .col(ColumnDef::new(UplinkFrames::Frequency).text().null())
                    .col(ColumnDef::new(UplinkFrames::Rssi).double().null())
                    .col(ColumnDef::new(UplinkFrames::ChannelRssi).double().null())
                    .col(ColumnDef::new(UplinkFrames::Snr).double().null())
                    .col(ColumnDef::new(UplinkFrames::ChannelIndex).integer().null())
                    .col(
                        ColumnDef::new(UplinkFrames::ConsumedAirtimeMs)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(UplinkFrames::GpsTime).text().null())
                    .col(
                        ColumnDef::new(UplinkFrames::ConcentratorTimestamp)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UplinkFrames::EventTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(UplinkFrames::ReceivedAtGw)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(UplinkFrames::ReceivedAtNet)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Window scans per gateway drive every KPI query
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_uplink_frames_gateway_received ON uplink_frames (gateway_id, received_at_gw)".to_string(),
            ))
            .await?;

        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_uplink_frames_device_received ON uplink_frames (device_id, received_at_gw)".to_string(),
            ))
            .await?;

        // Replica reconciliation looks frames up by (dev_addr, f_cnt)
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "CREATE INDEX IF NOT EXISTS idx_uplink_frames_addr_fcnt ON uplink_frames (dev_addr, f_cnt)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_uplink_frames_gateway_received")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_uplink_frames_device_received")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(Index::drop().name("idx_uplink_frames_addr_fcnt").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(UplinkFrames::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UplinkFrames {
    Table,
    Id,
    DevAddr,
    DeviceId,
    ApplicationId,
    GatewayId,
    GatewayEui,
    MType,
    FCnt,
    FPort,
    FCtrlAdr,
    JoinEui,
    DevEui,
    DevNonce,
    RawPayload,
    FrmPayload,
    PayloadSize,
    Bandwidth,
    SpreadingFactor,
    CodingRate,
    Frequency,
    Rssi,
    ChannelRssi,
    Snr,
    ChannelIndex,
    ConsumedAirtimeMs,
    GpsTime,
    ConcentratorTimestamp,
    EventTime,
    ReceivedAtGw,
    ReceivedAtNet,
}
