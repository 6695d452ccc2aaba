//! Stock business logic - consumables ("consumibles") and furniture ("muebles").
//!
//! Both classes are counted by quantity and share the same rules: stock never
//! goes negative, every change is logged as a movement, and changes are applied
//! with a single `UPDATE ... SET stock = stock + ?` so concurrent requests
//! cannot lose updates. Decrements only match rows that still hold enough stock.

use crate::{
    core::{
        movement::{self, MovementRecord},
        status::{AssetClass, MovementKind},
    },
    entities::{Consumable, Furniture, consumable, furniture},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};

/// Class-independent view of a stock item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockItem {
    /// `consumible` or `mueble`
    pub clase: AssetClass,
    /// Item id
    pub id: i64,
    /// Item name
    pub nombre: String,
    /// Units on hand
    pub stock: i32,
    /// Low-stock threshold
    pub stock_minimo: i32,
    /// Soft delete flag
    pub activo: bool,
}

impl From<consumable::Model> for StockItem {
    fn from(model: consumable::Model) -> Self {
        Self {
            clase: AssetClass::Consumible,
            id: model.id,
            nombre: model.nombre,
            stock: model.stock,
            stock_minimo: model.stock_minimo,
            activo: model.activo,
        }
    }
}

impl From<furniture::Model> for StockItem {
    fn from(model: furniture::Model) -> Self {
        Self {
            clase: AssetClass::Mueble,
            id: model.id,
            nombre: model.nombre,
            stock: model.stock,
            stock_minimo: model.stock_minimo,
            activo: model.activo,
        }
    }
}

/// Data required to register a consumable
#[derive(Debug, Clone, Deserialize)]
pub struct NewConsumable {
    /// Name
    pub nombre: String,
    /// Category
    pub categoria: String,
    /// Unit of measure, `unidad` when omitted
    #[serde(default)]
    pub unidad: Option<String>,
    /// Initial stock
    #[serde(default)]
    pub stock: i32,
    /// Low-stock threshold
    #[serde(default)]
    pub stock_minimo: i32,
}

/// Partial update of a consumable. Stock changes go through entrada/salida.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConsumableUpdate {
    /// Name
    pub nombre: Option<String>,
    /// Category
    pub categoria: Option<String>,
    /// Unit of measure
    pub unidad: Option<String>,
    /// Low-stock threshold
    pub stock_minimo: Option<i32>,
}

/// Data required to register a furniture item
#[derive(Debug, Clone, Deserialize)]
pub struct NewFurniture {
    /// Name
    pub nombre: String,
    /// Kind of furniture
    pub tipo: String,
    /// Storage location
    #[serde(default)]
    pub ubicacion: Option<String>,
    /// Initial stock
    #[serde(default)]
    pub stock: i32,
    /// Low-stock threshold
    #[serde(default)]
    pub stock_minimo: i32,
}

/// Partial update of a furniture item. Stock changes go through entrada/salida.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FurnitureUpdate {
    /// Name
    pub nombre: Option<String>,
    /// Kind of furniture
    pub tipo: Option<String>,
    /// Storage location
    pub ubicacion: Option<String>,
    /// Low-stock threshold
    pub stock_minimo: Option<i32>,
}

fn required(what: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(value.to_string())
}

fn non_negative(what: &str, value: i32) -> Result<i32> {
    if value < 0 {
        return Err(Error::validation(format!("{what} cannot be negative")));
    }
    Ok(value)
}

fn positive_quantity(cantidad: i32) -> Result<i32> {
    if cantidad < 1 {
        return Err(Error::validation(format!(
            "Quantity must be at least 1, got {cantidad}"
        )));
    }
    Ok(cantidad)
}

fn stock_class(clase: AssetClass) -> Result<AssetClass> {
    match clase {
        AssetClass::Consumible | AssetClass::Mueble => Ok(clase),
        AssetClass::Dispositivo => Err(Error::validation(
            "Devices are tracked individually, not by stock",
        )),
    }
}

pub(crate) const fn entity_name(clase: AssetClass) -> &'static str {
    match clase {
        AssetClass::Consumible => "consumable",
        AssetClass::Mueble => "furniture",
        AssetClass::Dispositivo => "device",
    }
}

/// Lists active consumables ordered by name.
pub async fn list_consumables(db: &DatabaseConnection) -> Result<Vec<consumable::Model>> {
    Consumable::find()
        .filter(consumable::Column::Activo.eq(true))
        .order_by_asc(consumable::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a consumable by id.
pub async fn get_consumable_by_id<C>(db: &C, id: i64) -> Result<Option<consumable::Model>>
where
    C: ConnectionTrait,
{
    Consumable::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Registers a consumable and logs its initial stock as `alta`.
pub async fn create_consumable(
    db: &DatabaseConnection,
    input: NewConsumable,
    actor: Option<i64>,
) -> Result<consumable::Model> {
    let nombre = required("Consumable name", &input.nombre)?;
    let categoria = required("Consumable category", &input.categoria)?;
    let unidad = match input.unidad {
        Some(unidad) => required("Unit", &unidad)?,
        None => "unidad".to_string(),
    };
    let stock = non_negative("Stock", input.stock)?;
    let stock_minimo = non_negative("Minimum stock", input.stock_minimo)?;

    let txn = db.begin().await?;
    let now = chrono::Utc::now().naive_utc();
    let created = consumable::ActiveModel {
        nombre: Set(nombre),
        categoria: Set(categoria),
        unidad: Set(unidad),
        stock: Set(stock),
        stock_minimo: Set(stock_minimo),
        activo: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    log_alta(&txn, AssetClass::Consumible, created.id, stock, actor).await?;
    txn.commit().await?;
    Ok(created)
}

/// Applies a partial update to an active consumable.
pub async fn update_consumable(
    db: &DatabaseConnection,
    id: i64,
    changes: ConsumableUpdate,
) -> Result<consumable::Model> {
    let current = get_consumable_by_id(db, id)
        .await?
        .filter(|c| c.activo)
        .ok_or_else(|| Error::not_found("consumable", id))?;

    let mut model: consumable::ActiveModel = current.into();
    if let Some(nombre) = changes.nombre {
        model.nombre = Set(required("Consumable name", &nombre)?);
    }
    if let Some(categoria) = changes.categoria {
        model.categoria = Set(required("Consumable category", &categoria)?);
    }
    if let Some(unidad) = changes.unidad {
        model.unidad = Set(required("Unit", &unidad)?);
    }
    if let Some(stock_minimo) = changes.stock_minimo {
        model.stock_minimo = Set(non_negative("Minimum stock", stock_minimo)?);
    }
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}

/// Soft deletes a consumable.
pub async fn deactivate_consumable(db: &DatabaseConnection, id: i64) -> Result<consumable::Model> {
    let current = get_consumable_by_id(db, id)
        .await?
        .filter(|c| c.activo)
        .ok_or_else(|| Error::not_found("consumable", id))?;

    let mut model: consumable::ActiveModel = current.into();
    model.activo = Set(false);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}

/// Lists active furniture ordered by name.
pub async fn list_furniture(db: &DatabaseConnection) -> Result<Vec<furniture::Model>> {
    Furniture::find()
        .filter(furniture::Column::Activo.eq(true))
        .order_by_asc(furniture::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a furniture item by id.
pub async fn get_furniture_by_id<C>(db: &C, id: i64) -> Result<Option<furniture::Model>>
where
    C: ConnectionTrait,
{
    Furniture::find_by_id(id).one(db).await.map_err(Into::into)
}

/// Registers a furniture item and logs its initial stock as `alta`.
pub async fn create_furniture(
    db: &DatabaseConnection,
    input: NewFurniture,
    actor: Option<i64>,
) -> Result<furniture::Model> {
    let nombre = required("Furniture name", &input.nombre)?;
    let tipo = required("Furniture type", &input.tipo)?;
    let stock = non_negative("Stock", input.stock)?;
    let stock_minimo = non_negative("Minimum stock", input.stock_minimo)?;

    let txn = db.begin().await?;
    let now = chrono::Utc::now().naive_utc();
    let created = furniture::ActiveModel {
        nombre: Set(nombre),
        tipo: Set(tipo),
        ubicacion: Set(input.ubicacion),
        stock: Set(stock),
        stock_minimo: Set(stock_minimo),
        activo: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    log_alta(&txn, AssetClass::Mueble, created.id, stock, actor).await?;
    txn.commit().await?;
    Ok(created)
}

/// Applies a partial update to an active furniture item.
pub async fn update_furniture(
    db: &DatabaseConnection,
    id: i64,
    changes: FurnitureUpdate,
) -> Result<furniture::Model> {
    let current = get_furniture_by_id(db, id)
        .await?
        .filter(|f| f.activo)
        .ok_or_else(|| Error::not_found("furniture", id))?;

    let mut model: furniture::ActiveModel = current.into();
    if let Some(nombre) = changes.nombre {
        model.nombre = Set(required("Furniture name", &nombre)?);
    }
    if let Some(tipo) = changes.tipo {
        model.tipo = Set(required("Furniture type", &tipo)?);
    }
    if changes.ubicacion.is_some() {
        model.ubicacion = Set(changes.ubicacion);
    }
    if let Some(stock_minimo) = changes.stock_minimo {
        model.stock_minimo = Set(non_negative("Minimum stock", stock_minimo)?);
    }
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}

/// Soft deletes a furniture item.
pub async fn deactivate_furniture(db: &DatabaseConnection, id: i64) -> Result<furniture::Model> {
    let current = get_furniture_by_id(db, id)
        .await?
        .filter(|f| f.activo)
        .ok_or_else(|| Error::not_found("furniture", id))?;

    let mut model: furniture::ActiveModel = current.into();
    model.activo = Set(false);
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}

async fn log_alta<C>(
    db: &C,
    clase: AssetClass,
    item_id: i64,
    stock: i32,
    actor: Option<i64>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    movement::record_movement(
        db,
        MovementRecord {
            clase,
            item_id,
            tipo: MovementKind::Alta,
            cantidad: stock,
            acta_id: None,
            usuario_id: actor,
            nota: None,
        },
    )
    .await?;
    Ok(())
}

/// Loads a consumable or furniture item as a [`StockItem`].
pub async fn get_stock_item<C>(db: &C, clase: AssetClass, id: i64) -> Result<Option<StockItem>>
where
    C: ConnectionTrait,
{
    Ok(match stock_class(clase)? {
        AssetClass::Consumible => get_consumable_by_id(db, id).await?.map(Into::into),
        _ => get_furniture_by_id(db, id).await?.map(Into::into),
    })
}

async fn apply_delta<C, E>(
    db: &C,
    id_column: E::Column,
    stock_column: E::Column,
    updated_column: E::Column,
    id: i64,
    delta: i32,
) -> Result<u64>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let mut update = E::update_many()
        .col_expr(stock_column, Expr::col(stock_column).add(delta))
        .col_expr(updated_column, Expr::value(chrono::Utc::now().naive_utc()))
        .filter(id_column.eq(id));
    update = if delta < 0 {
        update.filter(stock_column.gte(-delta))
    } else {
        update.filter(stock_column.lte(i32::MAX - delta))
    };
    Ok(update.exec(db).await?.rows_affected)
}

/// Atomically adds `delta` (negative to remove) to an active item's stock.
///
/// Used directly by acta signing, inside its transaction. Does not log a movement.
pub(crate) async fn adjust_stock<C>(
    db: &C,
    clase: AssetClass,
    id: i64,
    delta: i32,
) -> Result<StockItem>
where
    C: ConnectionTrait,
{
    let item = get_stock_item(db, clase, id)
        .await?
        .ok_or_else(|| Error::not_found(entity_name(clase), id))?;
    if !item.activo {
        return Err(Error::conflict(format!("{} is no longer active", item.nombre)));
    }

    let affected = match clase {
        AssetClass::Consumible => {
            apply_delta::<C, Consumable>(
                db,
                consumable::Column::Id,
                consumable::Column::Stock,
                consumable::Column::UpdatedAt,
                id,
                delta,
            )
            .await?
        }
        _ => {
            apply_delta::<C, Furniture>(
                db,
                furniture::Column::Id,
                furniture::Column::Stock,
                furniture::Column::UpdatedAt,
                id,
                delta,
            )
            .await?
        }
    };

    if affected == 0 {
        let current = get_stock_item(db, clase, id)
            .await?
            .ok_or_else(|| Error::not_found(entity_name(clase), id))?;
        if delta > 0 {
            return Err(Error::validation(format!(
                "Adding {delta} to {} would exceed the maximum stock of {}",
                current.nombre,
                i32::MAX
            )));
        }
        return Err(Error::InsufficientStock {
            item: current.nombre,
            available: current.stock,
            requested: -delta,
        });
    }

    get_stock_item(db, clase, id)
        .await?
        .ok_or_else(|| Error::not_found(entity_name(clase), id))
}

async fn move_stock(
    db: &DatabaseConnection,
    clase: AssetClass,
    id: i64,
    delta: i32,
    tipo: MovementKind,
    nota: Option<String>,
    actor: Option<i64>,
) -> Result<StockItem> {
    let txn = db.begin().await?;
    let item = adjust_stock(&txn, clase, id, delta).await?;
    movement::record_movement(
        &txn,
        MovementRecord {
            clase,
            item_id: id,
            tipo,
            cantidad: delta.abs(),
            acta_id: None,
            usuario_id: actor,
            nota,
        },
    )
    .await?;
    txn.commit().await?;
    Ok(item)
}

/// Adds stock (entrada).
#[tracing::instrument(skip(db))]
pub async fn add_stock(
    db: &DatabaseConnection,
    clase: AssetClass,
    id: i64,
    cantidad: i32,
    nota: Option<String>,
    actor: Option<i64>,
) -> Result<StockItem> {
    stock_class(clase)?;
    let cantidad = positive_quantity(cantidad)?;
    move_stock(db, clase, id, cantidad, MovementKind::Entrada, nota, actor).await
}

/// Removes stock (salida). Fails with [`Error::InsufficientStock`] rather than going negative.
#[tracing::instrument(skip(db))]
pub async fn remove_stock(
    db: &DatabaseConnection,
    clase: AssetClass,
    id: i64,
    cantidad: i32,
    nota: Option<String>,
    actor: Option<i64>,
) -> Result<StockItem> {
    stock_class(clase)?;
    let cantidad = positive_quantity(cantidad)?;
    move_stock(db, clase, id, -cantidad, MovementKind::Salida, nota, actor).await
}

/// Active items whose stock is at or below their threshold, lowest stock first.
pub async fn low_stock(db: &DatabaseConnection, clase: AssetClass) -> Result<Vec<StockItem>> {
    Ok(match stock_class(clase)? {
        AssetClass::Consumible => Consumable::find()
            .filter(consumable::Column::Activo.eq(true))
            .filter(
                Expr::col(consumable::Column::Stock)
                    .lte(Expr::col(consumable::Column::StockMinimo)),
            )
            .order_by_asc(consumable::Column::Stock)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
        _ => Furniture::find()
            .filter(furniture::Column::Activo.eq(true))
            .filter(
                Expr::col(furniture::Column::Stock).lte(Expr::col(furniture::Column::StockMinimo)),
            )
            .order_by_asc(furniture::Column::Stock)
            .all(db)
            .await?
            .into_iter()
            .map(Into::into)
            .collect(),
    })
}
