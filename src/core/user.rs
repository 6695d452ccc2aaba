//! User business logic - back-office accounts and login.

use crate::{
    config::AdminSeed,
    core::{auth, status::Role},
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Data required to register a user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    /// Display name
    pub nombre: String,
    /// Login email
    pub email: String,
    /// Clear-text password, hashed before storage
    pub password: String,
    /// Role, `operador` when omitted
    #[serde(default)]
    pub rol: Option<Role>,
}

pub(crate) fn validate_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if valid {
        Ok(email)
    } else {
        Err(Error::validation(format!("Invalid email address: {email}")))
    }
}

/// Registers a new user after validating name, email and password.
pub async fn create_user(db: &DatabaseConnection, input: NewUser) -> Result<user::Model> {
    if input.nombre.trim().is_empty() {
        return Err(Error::validation("User name cannot be empty"));
    }
    let email = validate_email(&input.email)?;
    if input.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if get_user_by_email(db, &email).await?.is_some() {
        return Err(Error::conflict(format!("Email {email} is already registered")));
    }

    let salt = auth::generate_salt();
    let now = chrono::Utc::now().naive_utc();
    let user = user::ActiveModel {
        nombre: Set(input.nombre.trim().to_string()),
        email: Set(email),
        password_hash: Set(auth::hash_password(&input.password, &salt)),
        password_salt: Set(salt),
        rol: Set(input.rol.unwrap_or(Role::Operador).as_str().to_string()),
        activo: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    user.insert(db).await.map_err(Into::into)
}

/// Finds a user by (normalised) email.
pub async fn get_user_by_email(db: &DatabaseConnection, email: &str) -> Result<Option<user::Model>> {
    User::find()
        .filter(user::Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a user by id.
pub async fn get_user_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Lists every user ordered by name.
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_asc(user::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Checks credentials and returns the user.
///
/// Unknown email, inactive account and wrong password produce the same error.
pub async fn login(db: &DatabaseConnection, email: &str, password: &str) -> Result<user::Model> {
    let rejected = || Error::Unauthorized {
        message: "Invalid email or password".to_string(),
    };

    let user = get_user_by_email(db, email).await?.ok_or_else(rejected)?;
    if !user.activo || !auth::verify_password(password, &user.password_salt, &user.password_hash) {
        tracing::info!("Failed login attempt for {}", user.email);
        return Err(rejected());
    }

    Ok(user)
}

/// Creates the configured administrator when no user exists yet.
///
/// Returns the created user, or `None` when users already exist.
pub async fn ensure_admin_seed(
    db: &DatabaseConnection,
    seed: &AdminSeed,
) -> Result<Option<user::Model>> {
    if User::find().count(db).await? > 0 {
        return Ok(None);
    }

    let admin = create_user(
        db,
        NewUser {
            nombre: seed.nombre.clone(),
            email: seed.email.clone(),
            password: seed.password.clone(),
            rol: Some(Role::Admin),
        },
    )
    .await?;
    tracing::info!("Seeded administrator account {}", admin.email);
    Ok(Some(admin))
}
