//! Acta business logic - custody hand-off and return records.
//!
//! An acta is created `pendiente_firma` with its line items. Nothing changes
//! in the inventory until it is signed: signing re-checks availability and
//! applies every effect (device assignment or release, stock decrement or
//! increment, movement log) in a single database transaction. Rejection
//! closes the acta with no inventory effect.

use crate::{
    core::{
        analyst,
        device::get_device_by_id,
        movement::{self, MovementRecord},
        status::{ActaKind, ActaStatus, AssetClass, DeviceStatus, MovementKind},
        stock,
    },
    entities::{
        Acta, ActaItem, Device, SignatureToken, acta, acta_item, analyst as analyst_entity, device,
        signature_token,
    },
    errors::{Error, Result},
};
use sea_orm::{
    DatabaseTransaction, QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One requested line item
#[derive(Debug, Clone, Deserialize)]
pub struct NewActaItem {
    /// Device, consumable or furniture id
    pub item_id: i64,
    /// Quantity, 1 when omitted
    #[serde(default = "default_quantity")]
    pub cantidad: i32,
}

const fn default_quantity() -> i32 {
    1
}

/// Data required to open an acta
#[derive(Debug, Clone, Deserialize)]
pub struct NewActa {
    /// Hand-off or return
    pub tipo: ActaKind,
    /// Asset class covered by the acta
    pub clase: AssetClass,
    /// Analyst receiving or returning the assets
    pub analista_id: i64,
    /// Free-form notes
    #[serde(default)]
    pub observaciones: Option<String>,
    /// Line items
    pub items: Vec<NewActaItem>,
}

/// Query filter for [`list_actas`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActaFilter {
    /// Restrict to one state
    pub estado: Option<ActaStatus>,
    /// Restrict to one asset class
    pub clase: Option<AssetClass>,
    /// Restrict to hand-offs or returns
    pub tipo: Option<ActaKind>,
    /// Restrict to one analyst
    pub analista_id: Option<i64>,
}

/// Line item with a human-readable description of the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActaItemDetail {
    /// Line item id
    pub id: i64,
    /// Item id within the acta's class
    pub item_id: i64,
    /// Quantity
    pub cantidad: i32,
    /// Description of the item at read time
    pub descripcion: String,
}

/// Acta with its analyst and line items
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActaDetail {
    /// The acta row
    #[serde(flatten)]
    pub acta: acta::Model,
    /// Addressee
    pub analista: Option<analyst_entity::Model>,
    /// Line items
    pub items: Vec<ActaItemDetail>,
}

/// Checks the shape of a new acta without touching the database.
pub fn validate_new_acta(input: &NewActa) -> Result<()> {
    if input.items.is_empty() {
        return Err(Error::validation("An acta needs at least one item"));
    }

    let mut seen = HashSet::new();
    for item in &input.items {
        if item.cantidad < 1 {
            return Err(Error::validation(format!(
                "Quantity for item {} must be at least 1",
                item.item_id
            )));
        }
        if !seen.insert(item.item_id) {
            return Err(Error::validation(format!(
                "Item {} is listed more than once",
                item.item_id
            )));
        }
        if input.clase == AssetClass::Dispositivo && item.cantidad != 1 {
            return Err(Error::validation(format!(
                "Device {} can only be listed with quantity 1",
                item.item_id
            )));
        }
    }
    Ok(())
}

/// Verifies every item can currently take part in an acta of this kind.
async fn check_availability<C>(
    db: &C,
    tipo: ActaKind,
    clase: AssetClass,
    analista_id: i64,
    items: &[(i64, i32)],
) -> Result<()>
where
    C: ConnectionTrait,
{
    for &(item_id, cantidad) in items {
        if clase == AssetClass::Dispositivo {
            let device = get_device_by_id(db, item_id)
                .await?
                .ok_or_else(|| Error::not_found("device", item_id))?;
            let status: DeviceStatus = device.estado.parse()?;
            match tipo {
                ActaKind::Entrega if status != DeviceStatus::Disponible => {
                    return Err(Error::conflict(format!(
                        "Device {} is {status} and cannot be handed out",
                        device.numero_serie
                    )));
                }
                ActaKind::Devolucion
                    if status != DeviceStatus::Asignado
                        || device.analista_id != Some(analista_id) =>
                {
                    return Err(Error::conflict(format!(
                        "Device {} is not assigned to analyst {analista_id}",
                        device.numero_serie
                    )));
                }
                _ => {}
            }
        } else {
            let item = stock::get_stock_item(db, clase, item_id)
                .await?
                .ok_or_else(|| Error::not_found(stock::entity_name(clase), item_id))?;
            if !item.activo {
                return Err(Error::conflict(format!("{} is no longer active", item.nombre)));
            }
            if tipo == ActaKind::Entrega && item.stock < cantidad {
                return Err(Error::InsufficientStock {
                    item: item.nombre,
                    available: item.stock,
                    requested: cantidad,
                });
            }
        }
    }
    Ok(())
}

/// Opens an acta in `pendiente_firma` after validating analyst and items.
///
/// Inventory is not reserved; availability is checked again when signing.
pub async fn create_acta(
    db: &DatabaseConnection,
    input: NewActa,
    creado_por: i64,
) -> Result<acta::Model> {
    validate_new_acta(&input)?;

    let txn = db.begin().await?;
    let analyst = analyst::get_analyst_by_id(&txn, input.analista_id)
        .await?
        .filter(|a| a.activo)
        .ok_or_else(|| Error::not_found("analyst", input.analista_id))?;

    let items: Vec<(i64, i32)> = input.items.iter().map(|i| (i.item_id, i.cantidad)).collect();
    check_availability(&txn, input.tipo, input.clase, analyst.id, &items).await?;

    let now = chrono::Utc::now().naive_utc();
    let created = acta::ActiveModel {
        tipo: Set(input.tipo.as_str().to_string()),
        clase: Set(input.clase.as_str().to_string()),
        analista_id: Set(analyst.id),
        estado: Set(ActaStatus::PendienteFirma.as_str().to_string()),
        observaciones: Set(input.observaciones),
        creado_por: Set(creado_por),
        firmante: Set(None),
        motivo_rechazo: Set(None),
        documento: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        cerrada_at: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for (item_id, cantidad) in items {
        acta_item::ActiveModel {
            acta_id: Set(created.id),
            item_id: Set(item_id),
            cantidad: Set(cantidad),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    tracing::info!(
        "Acta {} ({} {}) opened for analyst {}",
        created.id,
        created.tipo,
        created.clase,
        analyst.nombre
    );
    Ok(created)
}

/// Finds an acta row by id.
pub async fn get_acta_by_id<C>(db: &C, acta_id: i64) -> Result<Option<acta::Model>>
where
    C: ConnectionTrait,
{
    Acta::find_by_id(acta_id).one(db).await.map_err(Into::into)
}

/// Line items of an acta in insertion order.
pub async fn get_acta_items<C>(db: &C, acta_id: i64) -> Result<Vec<acta_item::Model>>
where
    C: ConnectionTrait,
{
    ActaItem::find()
        .filter(acta_item::Column::ActaId.eq(acta_id))
        .order_by_asc(acta_item::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn describe_item<C>(db: &C, clase: AssetClass, item_id: i64) -> Result<String>
where
    C: ConnectionTrait,
{
    let description = if clase == AssetClass::Dispositivo {
        get_device_by_id(db, item_id).await?.map(|d| {
            format!(
                "{} {} {} (S/N {})",
                d.tipo, d.marca, d.modelo, d.numero_serie
            )
        })
    } else {
        stock::get_stock_item(db, clase, item_id)
            .await?
            .map(|item| item.nombre)
    };
    Ok(description.unwrap_or_else(|| format!("{clase} #{item_id}")))
}

/// Loads an acta with its analyst and described line items.
pub async fn get_acta<C>(db: &C, acta_id: i64) -> Result<Option<ActaDetail>>
where
    C: ConnectionTrait,
{
    let Some(acta) = get_acta_by_id(db, acta_id).await? else {
        return Ok(None);
    };
    let clase: AssetClass = acta.clase.parse()?;
    let analista = analyst::get_analyst_by_id(db, acta.analista_id).await?;

    let mut items = Vec::new();
    for item in get_acta_items(db, acta_id).await? {
        items.push(ActaItemDetail {
            id: item.id,
            item_id: item.item_id,
            cantidad: item.cantidad,
            descripcion: describe_item(db, clase, item.item_id).await?,
        });
    }

    Ok(Some(ActaDetail {
        acta,
        analista,
        items,
    }))
}

/// Lists actas newest first.
pub async fn list_actas(db: &DatabaseConnection, filter: &ActaFilter) -> Result<Vec<acta::Model>> {
    let mut query = Acta::find();
    if let Some(estado) = filter.estado {
        query = query.filter(acta::Column::Estado.eq(estado.as_str()));
    }
    if let Some(clase) = filter.clase {
        query = query.filter(acta::Column::Clase.eq(clase.as_str()));
    }
    if let Some(tipo) = filter.tipo {
        query = query.filter(acta::Column::Tipo.eq(tipo.as_str()));
    }
    if let Some(analista_id) = filter.analista_id {
        query = query.filter(acta::Column::AnalistaId.eq(analista_id));
    }
    query
        .order_by_desc(acta::Column::CreatedAt)
        .order_by_desc(acta::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves an acta out of `pendiente_firma`, failing if another request closed it first.
async fn close_pending(
    txn: &DatabaseTransaction,
    acta: &acta::Model,
    estado: ActaStatus,
    firmante: Option<String>,
    motivo: Option<String>,
) -> Result<()> {
    let now = chrono::Utc::now().naive_utc();
    let mut update = Acta::update_many()
        .col_expr(acta::Column::Estado, Expr::value(estado.as_str()))
        .col_expr(acta::Column::UpdatedAt, Expr::value(now))
        .col_expr(acta::Column::CerradaAt, Expr::value(Some(now)))
        .filter(acta::Column::Id.eq(acta.id))
        .filter(acta::Column::Estado.eq(ActaStatus::PendienteFirma.as_str()));
    if let Some(firmante) = firmante {
        update = update.col_expr(acta::Column::Firmante, Expr::value(Some(firmante)));
    }
    if let Some(motivo) = motivo {
        update = update.col_expr(acta::Column::MotivoRechazo, Expr::value(Some(motivo)));
    }

    if update.exec(txn).await?.rows_affected == 0 {
        return Err(Error::conflict(format!(
            "Acta {} is no longer pending signature",
            acta.id
        )));
    }
    Ok(())
}

/// Revokes every token of an acta that has not been used yet.
pub(crate) async fn revoke_open_tokens<C>(db: &C, acta_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let result = SignatureToken::update_many()
        .col_expr(signature_token::Column::Revoked, Expr::value(true))
        .filter(signature_token::Column::ActaId.eq(acta_id))
        .filter(signature_token::Column::UsedAt.is_null())
        .filter(signature_token::Column::Revoked.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn move_device(
    txn: &DatabaseTransaction,
    device_id: i64,
    tipo: ActaKind,
    analista_id: i64,
) -> Result<()> {
    let now = chrono::Utc::now().naive_utc();
    let update = match tipo {
        ActaKind::Entrega => Device::update_many()
            .col_expr(device::Column::Estado, Expr::value(DeviceStatus::Asignado.as_str()))
            .col_expr(device::Column::AnalistaId, Expr::value(Some(analista_id)))
            .filter(device::Column::Estado.eq(DeviceStatus::Disponible.as_str())),
        ActaKind::Devolucion => Device::update_many()
            .col_expr(device::Column::Estado, Expr::value(DeviceStatus::Disponible.as_str()))
            .col_expr(device::Column::AnalistaId, Expr::value(Option::<i64>::None))
            .filter(device::Column::Estado.eq(DeviceStatus::Asignado.as_str()))
            .filter(device::Column::AnalistaId.eq(analista_id)),
    };

    let affected = update
        .col_expr(device::Column::UpdatedAt, Expr::value(now))
        .filter(device::Column::Id.eq(device_id))
        .exec(txn)
        .await?
        .rows_affected;

    if affected == 0 {
        // Lost a race or the device changed since the acta was opened.
        let device = get_device_by_id(txn, device_id)
            .await?
            .ok_or_else(|| Error::not_found("device", device_id))?;
        return Err(Error::conflict(format!(
            "Device {} is {} and cannot be {}",
            device.numero_serie,
            device.estado,
            if tipo == ActaKind::Entrega {
                "handed out"
            } else {
                "returned by this analyst"
            }
        )));
    }
    Ok(())
}

/// Signs a pending acta inside `txn` and applies its inventory effects.
///
/// The caller commits. Any error leaves `txn` to be rolled back.
pub(crate) async fn apply_signature(
    txn: &DatabaseTransaction,
    acta: &acta::Model,
    firmante: String,
    actor: Option<i64>,
) -> Result<()> {
    let tipo: ActaKind = acta.tipo.parse()?;
    let clase: AssetClass = acta.clase.parse()?;

    close_pending(txn, acta, ActaStatus::Firmada, Some(firmante), None).await?;

    for item in get_acta_items(txn, acta.id).await? {
        let movement_kind = match (clase, tipo) {
            (AssetClass::Dispositivo, ActaKind::Entrega) => {
                move_device(txn, item.item_id, tipo, acta.analista_id).await?;
                MovementKind::Asignacion
            }
            (AssetClass::Dispositivo, ActaKind::Devolucion) => {
                move_device(txn, item.item_id, tipo, acta.analista_id).await?;
                MovementKind::Devolucion
            }
            (_, ActaKind::Entrega) => {
                stock::adjust_stock(txn, clase, item.item_id, -item.cantidad).await?;
                MovementKind::Salida
            }
            (_, ActaKind::Devolucion) => {
                stock::adjust_stock(txn, clase, item.item_id, item.cantidad).await?;
                MovementKind::Devolucion
            }
        };

        movement::record_movement(
            txn,
            MovementRecord {
                clase,
                item_id: item.item_id,
                tipo: movement_kind,
                cantidad: item.cantidad,
                acta_id: Some(acta.id),
                usuario_id: actor,
                nota: None,
            },
        )
        .await?;
    }

    Ok(())
}

pub(crate) fn required_text(what: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(value.to_string())
}

/// Signs an acta on behalf of `firmante` and applies its effects atomically.
#[tracing::instrument(skip(db))]
pub async fn sign_acta(
    db: &DatabaseConnection,
    acta_id: i64,
    firmante: &str,
    actor: Option<i64>,
) -> Result<acta::Model> {
    let firmante = required_text("Signer name", firmante)?;

    let txn = db.begin().await?;
    let acta = get_acta_by_id(&txn, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;
    apply_signature(&txn, &acta, firmante, actor).await?;
    revoke_open_tokens(&txn, acta_id).await?;
    let signed = get_acta_by_id(&txn, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;
    txn.commit().await?;

    tracing::info!("Acta {acta_id} signed");
    Ok(signed)
}

/// Rejects a pending acta inside `txn`. The caller commits.
pub(crate) async fn apply_rejection(
    txn: &DatabaseTransaction,
    acta: &acta::Model,
    motivo: String,
) -> Result<()> {
    close_pending(txn, acta, ActaStatus::Rechazada, None, Some(motivo)).await
}

/// Rejects a pending acta. No inventory changes; open tokens are revoked.
#[tracing::instrument(skip(db))]
pub async fn reject_acta(
    db: &DatabaseConnection,
    acta_id: i64,
    motivo: &str,
    actor: Option<i64>,
) -> Result<acta::Model> {
    let motivo = required_text("Rejection reason", motivo)?;

    let txn = db.begin().await?;
    let acta = get_acta_by_id(&txn, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;
    apply_rejection(&txn, &acta, motivo).await?;
    revoke_open_tokens(&txn, acta_id).await?;
    let rejected = get_acta_by_id(&txn, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;
    txn.commit().await?;

    tracing::info!("Acta {acta_id} rejected");
    Ok(rejected)
}

/// Records the stored path of the signed document for an acta.
pub async fn attach_document(
    db: &DatabaseConnection,
    acta_id: i64,
    path: String,
) -> Result<acta::Model> {
    let current = get_acta_by_id(db, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;

    let mut model: acta::ActiveModel = current.into();
    model.documento = Set(Some(path));
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    model.update(db).await.map_err(Into::into)
}
