//! Consumable entity - Stock-tracked consumables ("consumibles").
//!
//! `stock` is never negative; decrements go through `core::stock`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Consumable database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consumibles")]
pub struct Model {
    /// Unique identifier for the consumable
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name (e.g. "Toner HP 85A")
    pub nombre: String,
    /// Category for grouping
    pub categoria: String,
    /// Unit of measure (e.g. "unidad", "caja")
    pub unidad: String,
    /// Units on hand
    pub stock: i32,
    /// Threshold at or below which the item is reported as low stock
    pub stock_minimo: i32,
    /// Soft delete flag
    pub activo: bool,
    /// When the consumable was created
    pub created_at: DateTime,
    /// When the consumable was last modified
    pub updated_at: DateTime,
}

/// `Consumable` has no direct relationships; movements reference it by class and id
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
