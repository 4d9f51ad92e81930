//! Migration to create the gateway_kpis table.
//!
//! One row per (gateway, window): device rollups plus gateway-only metrics
//! (attribution-independent uplink count, connected-node counts, airtime
//! utilization, jitter, availability).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GatewayKpis::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GatewayKpis::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::WindowStart)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::WindowEnd)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GatewayKpis::GatewayId).text().not_null())
                    .col(
                        ColumnDef::new(GatewayKpis::TotalUlPktCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::NumConnectedDevices)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::NumIdentifiedDevices)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::NumUnidentifiedDevices)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::TotalConsumedAirtimeMs)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayKpis::Utilization).double().null())
                    .col(ColumnDef::new(GatewayKpis::JitterMeanMs).double().null())
                    .col(ColumnDef::new(GatewayKpis::JitterStdDevMs).double().null())
                    .col(ColumnDef::new(GatewayKpis::Availability).double().null())
                    .col(ColumnDef::new(GatewayKpis::AvgSamplingRate).double().null())
                    .col(
                        ColumnDef::new(GatewayKpis::TotalDlPktCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::TotalRegisteredUlPktCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::TotalUniqueUlCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::TotalPacketLoss)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::TotalPacketLossRatio)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::MissingFCntCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::MissingFCntRatio)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::Replica1Count)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::Replica2Count)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayKpis::Replica3Count)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayKpis::Replica1Ratio).double().null())
                    .col(ColumnDef::new(GatewayKpis::Replica2Ratio).double().null())
                    .col(ColumnDef::new(GatewayKpis::Replica3Ratio).double().null())
                    .col(ColumnDef::new(GatewayKpis::SnrMean).double().null())
                    .col(ColumnDef::new(GatewayKpis::SnrVariance).double().null())
                    .col(ColumnDef::new(GatewayKpis::RssiMean).double().null())
                    .col(ColumnDef::new(GatewayKpis::RssiVariance).double().null())
                    .col(ColumnDef::new(GatewayKpis::PayloadSizeMean).double().null())
                    .col(
                        ColumnDef::new(GatewayKpis::PayloadSizeVariance)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayKpis::ToaMean).double().null())
                    .col(ColumnDef::new(GatewayKpis::ToaVariance).double().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_gateway_kpis_window")
                    .table(GatewayKpis::Table)
                    .col(GatewayKpis::GatewayId)
                    .col(GatewayKpis::WindowStart)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_gateway_kpis_window").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GatewayKpis::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GatewayKpis {
    Table,
    Id,
    WindowStart,
    WindowEnd,
    GatewayId,
    TotalUlPktCount,
    NumConnectedDevices,
    NumIdentifiedDevices,
    NumUnidentifiedDevices,
    TotalConsumedAirtimeMs,
    Utilization,
    JitterMeanMs,
    JitterStdDevMs,
    Availability,
    AvgSamplingRate,
    TotalDlPktCount,
    TotalRegisteredUlPktCount,
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
    SnrMean,
    SnrVariance,
    RssiMean,
    RssiVariance,
    PayloadSizeMean,
    PayloadSizeVariance,
    ToaMean,
    ToaVariance,
}
