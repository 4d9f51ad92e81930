//! Monitored gateway entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

/// Working set of gateway ids the pipeline tracks; membership is managed by
/// the orchestration layer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "monitored_gateways")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub gateway_id: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
