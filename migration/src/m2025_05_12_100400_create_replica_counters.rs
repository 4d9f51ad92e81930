//! Migration to create the replica_counters table.
//!
//! One row per (dev_addr, f_cnt) observed at least once. The unique index is
//! what serializes concurrent reconciliation of the same frame: the upsert
//! targets it with ON CONFLICT.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReplicaCounters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReplicaCounters::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ReplicaCounters::DevAddr).text().not_null())
                    .col(
                        ColumnDef::new(ReplicaCounters::FCnt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplicaCounters::NumRxReplica)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplicaCounters::TotRxReplica)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplicaCounters::TotLossReplica)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplicaCounters::NumGateways)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReplicaCounters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_replica_counters_addr_fcnt")
                    .table(ReplicaCounters::Table)
                    .col(ReplicaCounters::DevAddr)
                    .col(ReplicaCounters::FCnt)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_replica_counters_addr_fcnt")
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(ReplicaCounters::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ReplicaCounters {
    Table,
    Id,
    DevAddr,
    FCnt,
    NumRxReplica,
    TotRxReplica,
    TotLossReplica,
    NumGateways,
    UpdatedAt,
}
