//! Acta item entity - Line items of an acta ("acta_detalles").
//!
//! `item_id` points into the table selected by the parent acta's `clase`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Acta line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "acta_detalles")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent acta
    pub acta_id: i64,
    /// Device, consumable or furniture id
    pub item_id: i64,
    /// Quantity (always 1 for devices)
    pub cantidad: i32,
}

/// Defines relationships between `ActaItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each line item belongs to one acta
    #[sea_orm(
        belongs_to = "super::acta::Entity",
        from = "Column::ActaId",
        to = "super::acta::Column::Id"
    )]
    Acta,
}

impl Related<super::acta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Acta.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
