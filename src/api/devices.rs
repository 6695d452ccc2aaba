//! `/api/maestros` - serialised devices.

use crate::{
    api::{
        AppState,
        auth::AuthUser,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    core::device::{self, DeviceFilter, DeviceUpdate, NewDevice},
    entities::{device as device_entity, movement},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;

/// GET /api/maestros/obtener-maestros
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<DeviceFilter>,
) -> Result<Json<Vec<device_entity::Model>>> {
    Ok(Json(device::list_devices(&state.db, &filter).await?))
}

/// GET /api/maestros/{id}
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<device_entity::Model>> {
    device::get_device_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("device", id))
}

/// POST /api/maestros
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewDevice>,
) -> Result<(StatusCode, Json<device_entity::Model>)> {
    let created = device::create_device(&state.db, input, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/maestros/{id}
pub async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<DeviceUpdate>,
) -> Result<Json<device_entity::Model>> {
    Ok(Json(
        device::update_device(&state.db, id, changes, Some(user.id)).await?,
    ))
}

/// Query string of DELETE /api/maestros/{id}
#[derive(Debug, Default, Deserialize)]
pub struct RetireQuery {
    /// Reason for retirement
    pub nota: Option<String>,
}

/// DELETE /api/maestros/{id}
pub async fn retire(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<RetireQuery>,
) -> Result<StatusCode> {
    device::retire_device(&state.db, id, query.nota, Some(user.id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/maestros/{id}/movimientos
pub async fn movements(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<movement::Model>>> {
    Ok(Json(device::device_movements(&state.db, id).await?))
}
