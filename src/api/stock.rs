//! `/api/consumibles` and `/api/muebles` - stock-tracked items.

use crate::{
    api::{
        AppState,
        auth::AuthUser,
        extract::{ApiJson, ApiPath},
    },
    core::{
        status::AssetClass,
        stock::{self, ConsumableUpdate, FurnitureUpdate, NewConsumable, NewFurniture, StockItem},
    },
    entities::{consumable, furniture},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;

/// Body of the entrada/salida routes
#[derive(Debug, Deserialize)]
pub struct StockChange {
    /// Units to add or remove
    pub cantidad: i32,
    /// Free-form note
    #[serde(default)]
    pub nota: Option<String>,
}

/// GET /api/consumibles
pub async fn list_consumables(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<consumable::Model>>> {
    Ok(Json(stock::list_consumables(&state.db).await?))
}

/// GET /api/consumibles/{id}
pub async fn get_consumable(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<consumable::Model>> {
    stock::get_consumable_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("consumable", id))
}

/// POST /api/consumibles
pub async fn create_consumable(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewConsumable>,
) -> Result<(StatusCode, Json<consumable::Model>)> {
    let created = stock::create_consumable(&state.db, input, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/consumibles/{id}
pub async fn update_consumable(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<ConsumableUpdate>,
) -> Result<Json<consumable::Model>> {
    Ok(Json(stock::update_consumable(&state.db, id, changes).await?))
}

/// DELETE /api/consumibles/{id}
pub async fn deactivate_consumable(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    stock::deactivate_consumable(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/consumibles/bajo-stock
pub async fn low_consumables(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<StockItem>>> {
    Ok(Json(stock::low_stock(&state.db, AssetClass::Consumible).await?))
}

/// POST /api/consumibles/{id}/entrada
pub async fn consumable_in(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<StockChange>,
) -> Result<Json<StockItem>> {
    let item = stock::add_stock(
        &state.db,
        AssetClass::Consumible,
        id,
        change.cantidad,
        change.nota,
        Some(user.id),
    )
    .await?;
    Ok(Json(item))
}

/// POST /api/consumibles/{id}/salida
pub async fn consumable_out(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<StockChange>,
) -> Result<Json<StockItem>> {
    let item = stock::remove_stock(
        &state.db,
        AssetClass::Consumible,
        id,
        change.cantidad,
        change.nota,
        Some(user.id),
    )
    .await?;
    Ok(Json(item))
}

/// GET /api/muebles
pub async fn list_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<furniture::Model>>> {
    Ok(Json(stock::list_furniture(&state.db).await?))
}

/// GET /api/muebles/{id}
pub async fn get_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<furniture::Model>> {
    stock::get_furniture_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("furniture", id))
}

/// POST /api/muebles
pub async fn create_furniture(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewFurniture>,
) -> Result<(StatusCode, Json<furniture::Model>)> {
    let created = stock::create_furniture(&state.db, input, Some(user.id)).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/muebles/{id}
pub async fn update_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<FurnitureUpdate>,
) -> Result<Json<furniture::Model>> {
    Ok(Json(stock::update_furniture(&state.db, id, changes).await?))
}

/// DELETE /api/muebles/{id}
pub async fn deactivate_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    stock::deactivate_furniture(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/muebles/bajo-stock
pub async fn low_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<StockItem>>> {
    Ok(Json(stock::low_stock(&state.db, AssetClass::Mueble).await?))
}

/// POST /api/muebles/{id}/entrada
pub async fn furniture_in(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<StockChange>,
) -> Result<Json<StockItem>> {
    let item = stock::add_stock(
        &state.db,
        AssetClass::Mueble,
        id,
        change.cantidad,
        change.nota,
        Some(user.id),
    )
    .await?;
    Ok(Json(item))
}

/// POST /api/muebles/{id}/salida
pub async fn furniture_out(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(change): ApiJson<StockChange>,
) -> Result<Json<StockItem>> {
    let item = stock::remove_stock(
        &state.db,
        AssetClass::Mueble,
        id,
        change.cantidad,
        change.nota,
        Some(user.id),
    )
    .await?;
    Ok(Json(item))
}
