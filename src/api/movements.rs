//! `/api/movimientos` - the movement log.

use crate::{
    api::{AppState, auth::AuthUser, extract::ApiQuery},
    core::movement::{self, MovementFilter},
    entities::movement as movement_entity,
    errors::Result,
};
use axum::{Json, extract::State};

/// GET /api/movimientos
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<MovementFilter>,
) -> Result<Json<Vec<movement_entity::Model>>> {
    Ok(Json(movement::list_movements(&state.db, &filter).await?))
}
