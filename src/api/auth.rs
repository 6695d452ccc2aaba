//! Bearer-token authentication for back-office routes.

use crate::{
    api::AppState,
    core::{auth, status::Role, user},
    errors::{Error, Result},
};
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

/// Authenticated back-office user
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User id
    pub id: i64,
    /// Login email
    pub email: String,
    /// Current role
    pub rol: Role,
}

fn bearer_token(parts: &Parts) -> Result<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::Unauthorized {
            message: "Missing bearer token".to_string(),
        })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = bearer_token(parts)?;
        let claims = auth::decode_jwt(token, &state.settings.jwt_secret)?;
        let user_id = claims.user_id()?;

        // Deactivation and role changes apply before the token expires.
        let account = user::get_user_by_id(&state.db, user_id)
            .await?
            .filter(|u| u.activo)
            .ok_or_else(|| Error::Unauthorized {
                message: "Account is disabled".to_string(),
            })?;

        Ok(Self {
            id: account.id,
            email: account.email,
            rol: account.rol.parse()?,
        })
    }
}

/// Authenticated user holding the `admin` role
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.rol != Role::Admin {
            return Err(Error::Forbidden {
                message: "Administrator role required".to_string(),
            });
        }
        Ok(Self(user))
    }
}
