//! Movement log - append-only record of every inventory change.

use crate::{
    core::status::{AssetClass, MovementKind},
    entities::{Movement, movement},
    errors::Result,
};
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*};
use serde::Deserialize;

/// One movement to record
#[derive(Debug, Clone)]
pub struct MovementRecord {
    /// Asset class of the item
    pub clase: AssetClass,
    /// Item id
    pub item_id: i64,
    /// Kind of movement
    pub tipo: MovementKind,
    /// Units moved
    pub cantidad: i32,
    /// Acta that caused it
    pub acta_id: Option<i64>,
    /// Acting user
    pub usuario_id: Option<i64>,
    /// Free-form note
    pub nota: Option<String>,
}

/// Query filter for [`list_movements`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovementFilter {
    /// Restrict to one asset class
    pub clase: Option<AssetClass>,
    /// Restrict to one item (usually combined with `clase`)
    pub item_id: Option<i64>,
    /// Restrict to movements caused by one acta
    pub acta_id: Option<i64>,
    /// Maximum rows, newest first (default 200)
    pub limit: Option<u64>,
}

/// Appends a movement. Accepts a transaction so it commits with the change it describes.
pub async fn record_movement<C>(db: &C, record: MovementRecord) -> Result<movement::Model>
where
    C: ConnectionTrait,
{
    let movement = movement::ActiveModel {
        clase: Set(record.clase.as_str().to_string()),
        item_id: Set(record.item_id),
        tipo: Set(record.tipo.as_str().to_string()),
        cantidad: Set(record.cantidad),
        acta_id: Set(record.acta_id),
        usuario_id: Set(record.usuario_id),
        nota: Set(record.nota),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };
    movement.insert(db).await.map_err(Into::into)
}

/// Lists movements newest first.
pub async fn list_movements(
    db: &DatabaseConnection,
    filter: &MovementFilter,
) -> Result<Vec<movement::Model>> {
    let mut query = Movement::find();
    if let Some(clase) = filter.clase {
        query = query.filter(movement::Column::Clase.eq(clase.as_str()));
    }
    if let Some(item_id) = filter.item_id {
        query = query.filter(movement::Column::ItemId.eq(item_id));
    }
    if let Some(acta_id) = filter.acta_id {
        query = query.filter(movement::Column::ActaId.eq(acta_id));
    }

    query
        .order_by_desc(movement::Column::CreatedAt)
        .order_by_desc(movement::Column::Id)
        .limit(filter.limit.unwrap_or(200))
        .all(db)
        .await
        .map_err(Into::into)
}

/// Movement history of a single item, newest first.
pub async fn item_history(
    db: &DatabaseConnection,
    clase: AssetClass,
    item_id: i64,
) -> Result<Vec<movement::Model>> {
    list_movements(
        db,
        &MovementFilter {
            clase: Some(clase),
            item_id: Some(item_id),
            ..Default::default()
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    fn record(clase: AssetClass, item_id: i64, tipo: MovementKind) -> MovementRecord {
        MovementRecord {
            clase,
            item_id,
            tipo,
            cantidad: 1,
            acta_id: None,
            usuario_id: None,
            nota: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_filter_movements() -> Result<()> {
        let db = setup_test_db().await?;
        record_movement(&db, record(AssetClass::Dispositivo, 1, MovementKind::Alta)).await?;
        record_movement(&db, record(AssetClass::Dispositivo, 2, MovementKind::Alta)).await?;
        record_movement(&db, record(AssetClass::Consumible, 1, MovementKind::Entrada)).await?;
        let last =
            record_movement(&db, record(AssetClass::Dispositivo, 1, MovementKind::Baja)).await?;

        let history = item_history(&db, AssetClass::Dispositivo, 1).await?;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], last);

        let consumables = list_movements(
            &db,
            &MovementFilter {
                clase: Some(AssetClass::Consumible),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(consumables.len(), 1);
        assert_eq!(consumables[0].tipo, "entrada");

        let limited = list_movements(
            &db,
            &MovementFilter {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(limited.len(), 2);
        Ok(())
    }
}
