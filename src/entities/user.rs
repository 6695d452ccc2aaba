//! User entity - Back-office accounts that log into the API.
//!
//! Passwords are stored as a salted hash (see `core::auth`), never in clear.
//! `rol` is either `"admin"` or `"operador"`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuarios")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub nombre: String,
    /// Login email, unique across users
    #[sea_orm(unique)]
    pub email: String,
    /// Hex-encoded salted password hash
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Per-user salt
    #[serde(skip_serializing)]
    pub password_salt: String,
    /// Role: `"admin"` or `"operador"`
    pub rol: String,
    /// Inactive users cannot log in
    pub activo: bool,
    /// When the user was created
    pub created_at: DateTime,
    /// When the user was last modified
    pub updated_at: DateTime,
}

/// `User` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
