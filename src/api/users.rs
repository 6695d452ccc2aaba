//! `/api/user` - login and back-office accounts.

use crate::{
    api::{
        AppState,
        auth::{AdminUser, AuthUser},
        extract::ApiJson,
    },
    core::{
        auth,
        user::{self, NewUser},
    },
    entities::user as user_entity,
    errors::{Error, Result},
};
use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: String,
    /// Clear-text password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Bearer token
    pub token: String,
    /// The logged-in user
    pub usuario: user_entity::Model,
}

/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let usuario = user::login(&state.db, &input.email, &input.password).await?;
    let token = auth::issue_jwt(
        &usuario,
        &state.settings.jwt_secret,
        state.settings.jwt_ttl_hours,
    )?;
    tracing::info!("User {} logged in", usuario.email);
    Ok(Json(LoginResponse { token, usuario }))
}

/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    ApiJson(input): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<user_entity::Model>)> {
    let created = user::create_user(&state.db, input).await?;
    tracing::info!("{} registered user {}", admin.email, created.email);
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/user/me
pub async fn me(
    State(state): State<AppState>,
    current: AuthUser,
) -> Result<Json<user_entity::Model>> {
    user::get_user_by_id(&state.db, current.id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("user", current.id))
}

/// GET /api/user
pub async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<user_entity::Model>>> {
    Ok(Json(user::list_users(&state.db).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{send, token_for};
    use crate::core::status::Role;
    use crate::test_utils::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_login_and_register_flow() -> Result<()> {
        let db = setup_test_db().await?;
        let admin = create_test_user(&db, "admin@example.com", Role::Admin).await?;
        let dir = tempfile::tempdir()?;
        let app = crate::api::router(test_state(
            db,
            Arc::new(RecordingMailer::default()),
            dir.path(),
        ));

        let (status, body) = send(
            &app,
            "POST",
            "/api/user/login",
            None,
            Some(json!({"email": "admin@example.com", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email or password");

        let (status, body) = send(
            &app,
            "POST",
            "/api/user/login",
            None,
            Some(json!({"email": "ADMIN@example.com", "password": TEST_PASSWORD})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["usuario"]["rol"], "admin");
        let token = body["token"].as_str().unwrap_or_default().to_string();
        assert!(!token.is_empty());

        let new_user = json!({
            "nombre": "Operador",
            "email": "op@example.com",
            "password": "longenough"
        });
        let (status, body) =
            send(&app, "POST", "/api/user/register", Some(&token), Some(new_user.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["rol"], "operador");

        let (status, _) =
            send(&app, "POST", "/api/user/register", Some(&token), Some(new_user)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(&app, "GET", "/api/user", Some(&token_for(&admin)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().map(Vec::len), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() -> Result<()> {
        let db = setup_test_db().await?;
        let dir = tempfile::tempdir()?;
        let app = crate::api::router(test_state(
            db,
            Arc::new(RecordingMailer::default()),
            dir.path(),
        ));

        let (status, body) = send(
            &app,
            "POST",
            "/api/user/login",
            None,
            Some(json!({"email": "a@b.c"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
        Ok(())
    }
}
