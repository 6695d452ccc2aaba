//! HTTP interface.
//!
//! JSON over axum. Back-office routes take a bearer JWT (see [`auth`]); the
//! signature routes under `/api/firma` are authorised by the emailed token
//! alone.

pub mod actas;
pub mod analysts;
pub mod auth;
pub mod devices;
pub mod error;
pub mod extract;
pub mod movements;
pub mod signature;
pub mod stock;
pub mod users;

use crate::{config::Settings, notify::Mailer, storage::UploadStore};
use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Resolved settings
    pub settings: Arc<Settings>,
    /// Outgoing mail
    pub mailer: Arc<dyn Mailer>,
    /// Signed document storage
    pub uploads: UploadStore,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    let user_routes = Router::new()
        .route("/login", post(users::login))
        .route("/register", post(users::register))
        .route("/me", get(users::me))
        .route("/", get(users::list));

    let analyst_routes = Router::new()
        .route("/", get(analysts::list).post(analysts::create))
        .route(
            "/{id}",
            get(analysts::get)
                .put(analysts::update)
                .delete(analysts::deactivate),
        );

    let device_routes = Router::new()
        .route("/", post(devices::create))
        .route("/obtener-maestros", get(devices::list))
        .route(
            "/{id}",
            get(devices::get).put(devices::update).delete(devices::retire),
        )
        .route("/{id}/movimientos", get(devices::movements));

    let consumable_routes = Router::new()
        .route("/", get(stock::list_consumables).post(stock::create_consumable))
        .route("/bajo-stock", get(stock::low_consumables))
        .route(
            "/{id}",
            get(stock::get_consumable)
                .put(stock::update_consumable)
                .delete(stock::deactivate_consumable),
        )
        .route("/{id}/entrada", post(stock::consumable_in))
        .route("/{id}/salida", post(stock::consumable_out));

    let furniture_routes = Router::new()
        .route("/", get(stock::list_furniture).post(stock::create_furniture))
        .route("/bajo-stock", get(stock::low_furniture))
        .route(
            "/{id}",
            get(stock::get_furniture)
                .put(stock::update_furniture)
                .delete(stock::deactivate_furniture),
        )
        .route("/{id}/entrada", post(stock::furniture_in))
        .route("/{id}/salida", post(stock::furniture_out));

    let acta_routes = Router::new()
        .route("/", get(actas::list).post(actas::create))
        .route("/{id}", get(actas::get))
        .route("/{id}/firmar", post(actas::sign))
        .route("/{id}/rechazar", post(actas::reject))
        .route("/{id}/reenviar", post(actas::resend))
        .route(
            "/{id}/documento",
            post(actas::upload_document).get(actas::download_document),
        );

    let signature_routes = Router::new()
        .route("/{token}", get(signature::view))
        .route("/{token}/firmar", post(signature::sign))
        .route("/{token}/rechazar", post(signature::reject));

    Router::new()
        .route("/api/health", get(health))
        .nest("/api/user", user_routes)
        .nest("/api/analistas", analyst_routes)
        .nest("/api/maestros", device_routes)
        .nest("/api/consumibles", consumable_routes)
        .nest("/api/muebles", furniture_routes)
        .nest("/api/actas", acta_routes)
        .route("/api/movimientos", get(movements::list))
        .nest("/api/firma", signature_routes)
        .route("/actaConsumible/{id}/reenviar", post(actas::resend_consumable))
        .route("/actaDispositivo/{id}/reenviar", post(actas::resend_device))
        .route("/actaMueble/{id}/reenviar", post(actas::resend_furniture))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::{core::auth::issue_jwt, entities::user};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    /// Sends a request and returns the status with the body parsed as JSON
    /// (`Null` when empty).
    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };
        (status, json)
    }

    /// Session token for `user` signed with the test secret.
    pub fn token_for(user: &user::Model) -> String {
        issue_jwt(user, "test-secret", 1).expect("token")
    }
}
