//! Movement entity - Append-only audit log of inventory changes ("movimientos").
//!
//! Rows reference items polymorphically through (`clase`, `item_id`), and the
//! acta that caused them when there is one.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Movement database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "movimientos")]
pub struct Model {
    /// Unique identifier for the movement
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Asset class of the item
    pub clase: String,
    /// Item id within its class
    pub item_id: i64,
    /// `"alta"`, `"entrada"`, `"salida"`, `"asignacion"`, `"devolucion"`, `"baja"` or `"ajuste"`
    pub tipo: String,
    /// Units moved
    pub cantidad: i32,
    /// Acta that caused the movement, if any
    pub acta_id: Option<i64>,
    /// User that performed the movement, if known
    pub usuario_id: Option<i64>,
    /// Free-form note
    pub nota: Option<String>,
    /// When the movement happened
    pub created_at: DateTime,
}

/// `Movement` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
