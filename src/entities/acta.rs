//! Acta entity - Signed custody hand-off (`entrega`) and return (`devolucion`) records.
//!
//! An acta covers one asset class (`dispositivo`, `consumible` or `mueble`),
//! is addressed to one analyst and starts in `pendiente_firma`. It is closed
//! exactly once, either `firmada` or `rechazada`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Acta database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "actas")]
pub struct Model {
    /// Unique identifier for the acta
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"entrega"` or `"devolucion"`
    pub tipo: String,
    /// `"dispositivo"`, `"consumible"` or `"mueble"`
    pub clase: String,
    /// Analyst receiving or returning the assets
    pub analista_id: i64,
    /// `"pendiente_firma"`, `"firmada"` or `"rechazada"`
    pub estado: String,
    /// Free-form notes
    pub observaciones: Option<String>,
    /// User who created the acta
    pub creado_por: i64,
    /// Name typed by the signer
    pub firmante: Option<String>,
    /// Reason given when rejected
    pub motivo_rechazo: Option<String>,
    /// Stored path of the uploaded signed document
    pub documento: Option<String>,
    /// When the acta was created
    pub created_at: DateTime,
    /// When the acta was last modified
    pub updated_at: DateTime,
    /// When the acta was signed or rejected
    pub cerrada_at: Option<DateTime>,
}

/// Defines relationships between Acta and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each acta is addressed to one analyst
    #[sea_orm(
        belongs_to = "super::analyst::Entity",
        from = "Column::AnalistaId",
        to = "super::analyst::Column::Id"
    )]
    Analyst,
    /// One acta has many line items
    #[sea_orm(has_many = "super::acta_item::Entity")]
    Items,
    /// One acta has many signature tokens over its life
    #[sea_orm(has_many = "super::signature_token::Entity")]
    SignatureTokens,
}

impl Related<super::analyst::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Analyst.def()
    }
}

impl Related<super::acta_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::signature_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SignatureTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
