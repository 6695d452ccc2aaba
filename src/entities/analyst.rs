//! Analyst entity - People who take custody of assets ("analistas").
//!
//! Actas are always addressed to one analyst, and assigned devices point back
//! to the analyst holding them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Analyst database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "analistas")]
pub struct Model {
    /// Unique identifier for the analyst
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name
    pub nombre: String,
    /// Email where signature links are sent
    pub email: String,
    /// National id or employee number
    pub documento: Option<String>,
    /// Department
    pub departamento: Option<String>,
    /// Job title
    pub cargo: Option<String>,
    /// Soft delete flag - inactive analysts cannot receive new actas
    pub activo: bool,
    /// When the analyst was created
    pub created_at: DateTime,
    /// When the analyst was last modified
    pub updated_at: DateTime,
}

/// Defines relationships between Analyst and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One analyst holds many devices
    #[sea_orm(has_many = "super::device::Entity")]
    Devices,
    /// One analyst is the addressee of many actas
    #[sea_orm(has_many = "super::acta::Entity")]
    Actas,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

impl Related<super::acta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Actas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
