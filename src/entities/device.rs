//! Device entity - Tracked, serialised assets ("maestros" / "dispositivos").
//!
//! A device is in exactly one `estado`. While `asignado`, `analista_id` names
//! the analyst holding it; in every other state it is `None`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Device database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "maestros")]
pub struct Model {
    /// Unique identifier for the device
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Kind of device (e.g. "notebook", "monitor")
    pub tipo: String,
    /// Brand
    pub marca: String,
    /// Model name
    pub modelo: String,
    /// Serial number, unique across devices
    #[sea_orm(unique)]
    pub numero_serie: String,
    /// `"disponible"`, `"asignado"`, `"mantenimiento"` or `"baja"`
    pub estado: String,
    /// Analyst holding the device while assigned
    pub analista_id: Option<i64>,
    /// Physical location
    pub ubicacion: Option<String>,
    /// Free-form notes
    pub observaciones: Option<String>,
    /// When the device was registered
    pub created_at: DateTime,
    /// When the device was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Device and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each assigned device belongs to one analyst
    #[sea_orm(
        belongs_to = "super::analyst::Entity",
        from = "Column::AnalistaId",
        to = "super::analyst::Column::Id"
    )]
    Analyst,
}

impl Related<super::analyst::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyst.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
