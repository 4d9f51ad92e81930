//! Migration to create the gateway_connection_stats table.
//!
//! Connection-lifecycle snapshots: connected_at, last seen timestamps,
//! rolling traffic counters, round-trip-time summary, and the positional
//! sub-band duty-cycle list stored as JSON. Availability is derived from
//! consecutive rows ordered by event_time.

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
                    .table(GatewayConnectionStats::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GatewayConnectionStats::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::GatewayId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::GatewayEui)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::Protocol)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::ConnectedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::LastStatusReceivedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::LastStatusTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::LastUplinkReceivedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::LastDownlinkReceivedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::BootTime)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::GatewayServerVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::FpgaVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::HalVersion)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::Latitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::Longitude)
                            .double()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::Altitude)
                            .double()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayConnectionStats::Source).text().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Ip).text().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Txin).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Txok).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Lpps).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Rxin).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Rxok).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Rxfw).double().null())
                    .col(ColumnDef::new(GatewayConnectionStats::Ackr).double().null())
                    .col(
                        ColumnDef::new(GatewayConnectionStats::UplinkCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::DownlinkCount)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(GatewayConnectionStats::RttMin).text().null())
                    .col(ColumnDef::new(GatewayConnectionStats::RttMax).text().null())
                    .col(
                        ColumnDef::new(GatewayConnectionStats::RttMedian)
                            .text()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::RttCount)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::SubBands)
                            .json_binary()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(GatewayConnectionStats::EventTime)
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
                "CREATE INDEX IF NOT EXISTS idx_connection_stats_gateway_event ON gateway_connection_stats (gateway_id, event_time)".to_string(),
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_connection_stats_gateway_event")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(GatewayConnectionStats::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum GatewayConnectionStats {
    Table,
    Id,
    GatewayId,
    GatewayEui,
    Protocol,
    ConnectedAt,
    LastStatusReceivedAt,
    LastStatusTime,
    LastUplinkReceivedAt,
    LastDownlinkReceivedAt,
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
    UplinkCount,
    DownlinkCount,
    RttMin,
    RttMax,
    RttMedian,
    RttCount,
    SubBands,
    EventTime,
}
