//! Migration to create the end_device_kpis table.
//!
//! One row per (device, gateway, window). The unique index on
//! (device_id, gateway_id, window_start) is the natural key; the scheduler
//! writes each window at most once.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(EndDeviceKpis::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(EndDeviceKpis::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::WindowEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EndDeviceKpis::DeviceId).text().not_null())
                    .col(ColumnDef::new(EndDeviceKpis::GatewayId).text().not_null())
                    .col(
                        ColumnDef::new(EndDeviceKpis::SamplingRate)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::TotalDlPktCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::TotalUlPktCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::TotalUniqueUlCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::TotalPacketLoss)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::TotalPacketLossRatio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::MissingFCntCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::MissingFCntRatio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica1Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica2Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica3Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica1Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica2Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::Replica3Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwTotalPacketLoss)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwTotalPacketLossRatio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwMissingFCntCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwMissingFCntRatio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica1Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica2Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica3Count)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica1Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica2Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::GwReplica3Ratio)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::ConsumedDutyCycleMs)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(EndDeviceKpis::SnrMean).double().null())
                    .col(ColumnDef::new(EndDeviceKpis::SnrVariance).double().null())
                    .col(ColumnDef::new(EndDeviceKpis::RssiMean).double().null())
                    .col(ColumnDef::new(EndDeviceKpis::RssiVariance).double().null())
                    .col(
                        ColumnDef::new(EndDeviceKpis::PayloadSizeMean)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::PayloadSizeVariance)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(EndDeviceKpis::ToaMean).double().null())
                    .col(ColumnDef::new(EndDeviceKpis::ToaVariance).double().null())
                    .col(
                        ColumnDef::new(EndDeviceKpis::SfDistribution)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::SfRatios)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::FreqDistribution)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(EndDeviceKpis::FreqRatios)
                            .json_binary()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_end_device_kpis_window")
                    .table(EndDeviceKpis::Table)
                    .col(EndDeviceKpis::DeviceId)
                    .col(EndDeviceKpis::GatewayId)
                    .col(EndDeviceKpis::WindowStart)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_end_device_kpis_window").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(EndDeviceKpis::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum EndDeviceKpis {
    Table,
    Id,
    WindowStart,
    WindowEnd,
    DeviceId,
    GatewayId,
    SamplingRate,
    TotalDlPktCount,
    TotalUlPktCount,
    TotalUniqueUlCount,
    TotalPacketLoss,
    TotalPacketLossRatio,
    MissingFCntCount,
    MissingFCntRatio,
    #[sea_orm(iden = "replica_1_count")]
    Replica1Count,
    #[sea_orm(iden = "replica_2_count")]
    Replica2Count,
    #[sea_orm(iden = "replica_3_count")]
    Replica3Count,
    #[sea_orm(iden = "replica_1_ratio")]
    Replica1Ratio,
    #[sea_orm(iden = "replica_2_ratio")]
    Replica2Ratio,
    #[sea_orm(iden = "replica_3_ratio")]
    Replica3Ratio,
    GwTotalPacketLoss,
    GwTotalPacketLossRatio,
    GwMissingFCntCount,
    GwMissingFCntRatio,
    #[sea_orm(iden = "gw_replica_1_count")]
    GwReplica1Count,
    #[sea_orm(iden = "gw_replica_2_count")]
    GwReplica2Count,
    #[sea_orm(iden = "gw_replica_3_count")]
    GwReplica3Count,
    #[sea_orm(iden = "gw_replica_1_ratio")]
    GwReplica1Ratio,
    #[sea_orm(iden = "gw_replica_2_ratio")]
    GwReplica2Ratio,
    #[sea_orm(iden = "gw_replica_3_ratio")]
    GwReplica3Ratio,
    ConsumedDutyCycleMs,
    SnrMean,
    SnrVariance,
    RssiMean,
    RssiVariance,
    PayloadSizeMean,
    PayloadSizeVariance,
    ToaMean,
    ToaVariance,
    SfDistribution,
    SfRatios,
    FreqDistribution,
    FreqRatios,
}
