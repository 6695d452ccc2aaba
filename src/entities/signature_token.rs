//! Signature token entity - Single-use links for external acta signature ("tokens_firma").

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Signature token database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tokens_firma")]
pub struct Model {
    /// Unique identifier for the token row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Random token carried in the emailed link
    #[sea_orm(unique)]
    pub token: String,
    /// Acta the token can sign
    pub acta_id: i64,
    /// Address the link was sent to
    pub email: String,
    /// Token is refused after this instant
    pub expires_at: DateTime,
    /// Set once the token has been used to sign or reject
    pub used_at: Option<DateTime>,
    /// Set when a newer token replaces this one or the acta is closed
    pub revoked: bool,
    /// When the token was issued
    pub created_at: DateTime,
}

/// Defines relationships between `SignatureToken` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each token belongs to one acta
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
