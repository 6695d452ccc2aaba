//! `/api/analistas` - people who receive assets.

use crate::{
    api::{
        AppState,
        auth::AuthUser,
        extract::{ApiJson, ApiPath, ApiQuery},
    },
    core::analyst::{self, AnalystUpdate, NewAnalyst},
    entities::analyst as analyst_entity,
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;

/// Query string of GET /api/analistas
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Include deactivated analysts
    #[serde(default)]
    pub incluir_inactivos: bool,
}

/// GET /api/analistas
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<analyst_entity::Model>>> {
    Ok(Json(
        analyst::list_analysts(&state.db, query.incluir_inactivos).await?,
    ))
}

/// GET /api/analistas/{id}
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<analyst_entity::Model>> {
    analyst::get_analyst_by_id(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| Error::not_found("analyst", id))
}

/// POST /api/analistas
pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiJson(input): ApiJson<NewAnalyst>,
) -> Result<(StatusCode, Json<analyst_entity::Model>)> {
    let created = analyst::create_analyst(&state.db, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PUT /api/analistas/{id}
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(changes): ApiJson<AnalystUpdate>,
) -> Result<Json<analyst_entity::Model>> {
    Ok(Json(analyst::update_analyst(&state.db, id, changes).await?))
}

/// DELETE /api/analistas/{id}
pub async fn deactivate(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode> {
    let analyst = analyst::deactivate_analyst(&state.db, id).await?;
    tracing::info!("{} deactivated analyst {}", user.email, analyst.nombre);
    Ok(StatusCode::NO_CONTENT)
}
