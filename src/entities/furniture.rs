//! Furniture entity - Stock-tracked furniture ("muebles").

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Furniture database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "muebles")]
pub struct Model {
    /// Unique identifier for the furniture item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Name (e.g. "Silla ergonómica")
    pub nombre: String,
    /// Kind of furniture
    pub tipo: String,
    /// Storage location
    pub ubicacion: Option<String>,
    /// Units on hand
    pub stock: i32,
    /// Low-stock threshold
    pub stock_minimo: i32,
    /// Soft delete flag
    pub activo: bool,
    /// When the item was created
    pub created_at: DateTime,
    /// When the item was last modified
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
