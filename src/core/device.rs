//! Device business logic - serialised assets ("maestros").
//!
//! Assignment to and release from analysts happens only through signed actas
//! (see `core::acta`). This module covers registration, descriptive edits, the
//! maintenance switch and retirement.

use crate::{
    core::{
        movement::{self, MovementRecord},
        status::{AssetClass, DeviceStatus, MovementKind},
    },
    entities::{Device, device, movement as movement_entity},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;

/// Data required to register a device
#[derive(Debug, Clone, Deserialize)]
pub struct NewDevice {
    /// Kind of device
    pub tipo: String,
    /// Brand
    pub marca: String,
    /// Model name
    pub modelo: String,
    /// Serial number
    pub numero_serie: String,
    /// Physical location
    #[serde(default)]
    pub ubicacion: Option<String>,
    /// Free-form notes
    #[serde(default)]
    pub observaciones: Option<String>,
}

/// Partial update of a device; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceUpdate {
    /// Kind of device
    pub tipo: Option<String>,
    /// Brand
    pub marca: Option<String>,
    /// Model name
    pub modelo: Option<String>,
    /// Serial number
    pub numero_serie: Option<String>,
    /// Physical location
    pub ubicacion: Option<String>,
    /// Free-form notes
    pub observaciones: Option<String>,
    /// Only `disponible` and `mantenimiento` may be set here
    pub estado: Option<DeviceStatus>,
}

/// Query filter for [`list_devices`]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceFilter {
    /// Restrict to one state
    pub estado: Option<DeviceStatus>,
    /// Restrict to devices held by one analyst
    pub analista_id: Option<i64>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("Device {field} cannot be empty")));
    }
    Ok(value.to_string())
}

async fn ensure_serial_free<C>(db: &C, serial: &str, except_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let existing = Device::find()
        .filter(device::Column::NumeroSerie.eq(serial))
        .one(db)
        .await?;
    match existing {
        Some(other) if Some(other.id) != except_id => Err(Error::conflict(format!(
            "Serial number {serial} is already registered"
        ))),
        _ => Ok(()),
    }
}

/// Lists devices ordered by id, newest registrations last.
pub async fn list_devices(
    db: &DatabaseConnection,
    filter: &DeviceFilter,
) -> Result<Vec<device::Model>> {
    let mut query = Device::find();
    if let Some(estado) = filter.estado {
        query = query.filter(device::Column::Estado.eq(estado.as_str()));
    }
    if let Some(analista_id) = filter.analista_id {
        query = query.filter(device::Column::AnalistaId.eq(analista_id));
    }
    query
        .order_by_asc(device::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a device by id.
pub async fn get_device_by_id<C>(db: &C, device_id: i64) -> Result<Option<device::Model>>
where
    C: ConnectionTrait,
{
    Device::find_by_id(device_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers a device as `disponible` and records an `alta` movement.
pub async fn create_device(
    db: &DatabaseConnection,
    input: NewDevice,
    actor: Option<i64>,
) -> Result<device::Model> {
    let tipo = required("type", &input.tipo)?;
    let marca = required("brand", &input.marca)?;
    let modelo = required("model", &input.modelo)?;
    let numero_serie = required("serial number", &input.numero_serie)?;

    let txn = db.begin().await?;
    ensure_serial_free(&txn, &numero_serie, None).await?;

    let now = chrono::Utc::now().naive_utc();
    let created = device::ActiveModel {
        tipo: Set(tipo),
        marca: Set(marca),
        modelo: Set(modelo),
        numero_serie: Set(numero_serie),
        estado: Set(DeviceStatus::Disponible.as_str().to_string()),
        analista_id: Set(None),
        ubicacion: Set(input.ubicacion),
        observaciones: Set(input.observaciones),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    movement::record_movement(
        &txn,
        MovementRecord {
            clase: AssetClass::Dispositivo,
            item_id: created.id,
            tipo: MovementKind::Alta,
            cantidad: 1,
            acta_id: None,
            usuario_id: actor,
            nota: None,
        },
    )
    .await?;

    txn.commit().await?;
    Ok(created)
}

/// Applies a partial update.
///
/// The state may only be toggled between `disponible` and `mantenimiento`;
/// assignment happens through actas and retirement through [`retire_device`].
pub async fn update_device(
    db: &DatabaseConnection,
    device_id: i64,
    changes: DeviceUpdate,
    actor: Option<i64>,
) -> Result<device::Model> {
    let txn = db.begin().await?;
    let current = get_device_by_id(&txn, device_id)
        .await?
        .ok_or_else(|| Error::not_found("device", device_id))?;
    let current_status: DeviceStatus = current.estado.parse()?;

    if current_status == DeviceStatus::Baja {
        return Err(Error::conflict(format!(
            "Device {} is retired and cannot be modified",
            current.numero_serie
        )));
    }

    let mut status_change = None;
    if let Some(target) = changes.estado {
        if target != current_status {
            let allowed = matches!(
                (current_status, target),
                (DeviceStatus::Disponible, DeviceStatus::Mantenimiento)
                    | (DeviceStatus::Mantenimiento, DeviceStatus::Disponible)
            );
            if !allowed {
                return Err(Error::conflict(format!(
                    "Cannot change device state from {current_status} to {target}"
                )));
            }
            status_change = Some(target);
        }
    }

    let mut model: device::ActiveModel = current.into();
    if let Some(tipo) = changes.tipo {
        model.tipo = Set(required("type", &tipo)?);
    }
    if let Some(marca) = changes.marca {
        model.marca = Set(required("brand", &marca)?);
    }
    if let Some(modelo) = changes.modelo {
        model.modelo = Set(required("model", &modelo)?);
    }
    if let Some(serial) = changes.numero_serie {
        let serial = required("serial number", &serial)?;
        ensure_serial_free(&txn, &serial, Some(device_id)).await?;
        model.numero_serie = Set(serial);
    }
    if changes.ubicacion.is_some() {
        model.ubicacion = Set(changes.ubicacion);
    }
    if changes.observaciones.is_some() {
        model.observaciones = Set(changes.observaciones);
    }
    if let Some(target) = status_change {
        model.estado = Set(target.as_str().to_string());
    }
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    let updated = model.update(&txn).await?;

    if let Some(target) = status_change {
        movement::record_movement(
            &txn,
            MovementRecord {
                clase: AssetClass::Dispositivo,
                item_id: device_id,
                tipo: MovementKind::Ajuste,
                cantidad: 1,
                acta_id: None,
                usuario_id: actor,
                nota: Some(format!("estado: {target}")),
            },
        )
        .await?;
    }

    txn.commit().await?;
    Ok(updated)
}

/// Retires a device (`baja`). Refused while the device is assigned.
#[tracing::instrument(skip(db))]
pub async fn retire_device(
    db: &DatabaseConnection,
    device_id: i64,
    nota: Option<String>,
    actor: Option<i64>,
) -> Result<device::Model> {
    let txn = db.begin().await?;
    let current = get_device_by_id(&txn, device_id)
        .await?
        .ok_or_else(|| Error::not_found("device", device_id))?;

    match current.estado.parse::<DeviceStatus>()? {
        DeviceStatus::Asignado => {
            return Err(Error::conflict(format!(
                "Device {} is assigned and must be returned first",
                current.numero_serie
            )));
        }
        DeviceStatus::Baja => {
            return Err(Error::conflict(format!(
                "Device {} is already retired",
                current.numero_serie
            )));
        }
        DeviceStatus::Disponible | DeviceStatus::Mantenimiento => {}
    }

    let mut model: device::ActiveModel = current.into();
    model.estado = Set(DeviceStatus::Baja.as_str().to_string());
    model.updated_at = Set(chrono::Utc::now().naive_utc());
    let retired = model.update(&txn).await?;

    movement::record_movement(
        &txn,
        MovementRecord {
            clase: AssetClass::Dispositivo,
            item_id: device_id,
            tipo: MovementKind::Baja,
            cantidad: 1,
            acta_id: None,
            usuario_id: actor,
            nota,
        },
    )
    .await?;

    txn.commit().await?;
    tracing::info!("Device {} retired", retired.numero_serie);
    Ok(retired)
}

/// Movement history of a device, newest first.
pub async fn device_movements(
    db: &DatabaseConnection,
    device_id: i64,
) -> Result<Vec<movement_entity::Model>> {
    if get_device_by_id(db, device_id).await?.is_none() {
        return Err(Error::not_found("device", device_id));
    }
    movement::item_history(db, AssetClass::Dispositivo, device_id).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_device_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let mut input = sample_device("SN-1");
        input.numero_serie = "   ".to_string();

        let result = create_device(&db, input, None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_device_records_alta() -> Result<()> {
        let db = setup_test_db().await?;
        let device = create_test_device(&db, "SN-1").await?;

        assert_eq!(device.estado, "disponible");
        assert!(device.analista_id.is_none());

        let history = device_movements(&db, device.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tipo, "alta");
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_serial_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_device(&db, "SN-1").await?;

        let result = create_device(&db, sample_device("SN-1"), None).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        let other = create_test_device(&db, "SN-2").await?;
        let result = update_device(
            &db,
            other.id,
            DeviceUpdate {
                numero_serie: Some("SN-1".to_string()),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_maintenance_toggle() -> Result<()> {
        let db = setup_test_db().await?;
        let device = create_test_device(&db, "SN-1").await?;

        let updated = update_device(
            &db,
            device.id,
            DeviceUpdate {
                estado: Some(DeviceStatus::Mantenimiento),
                ubicacion: Some("Taller".to_string()),
                ..Default::default()
            },
            None,
        )
        .await?;
        assert_eq!(updated.estado, "mantenimiento");
        assert_eq!(updated.ubicacion.as_deref(), Some("Taller"));

        let maintenance = list_devices(
            &db,
            &DeviceFilter {
                estado: Some(DeviceStatus::Mantenimiento),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(maintenance.len(), 1);

        let result = update_device(
            &db,
            device.id,
            DeviceUpdate {
                estado: Some(DeviceStatus::Asignado),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_retire_device() -> Result<()> {
        let db = setup_test_db().await?;
        let device = create_test_device(&db, "SN-1").await?;

        let retired = retire_device(&db, device.id, Some("Pantalla rota".to_string()), None).await?;
        assert_eq!(retired.estado, "baja");

        let again = retire_device(&db, device.id, None, None).await;
        assert!(matches!(again.unwrap_err(), Error::Conflict { .. }));

        let edit = update_device(
            &db,
            device.id,
            DeviceUpdate {
                marca: Some("Otra".to_string()),
                ..Default::default()
            },
            None,
        )
        .await;
        assert!(matches!(edit.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_retire_assigned_device_conflicts() -> Result<()> {
        let (db, ctx) = setup_with_assigned_device().await?;

        let result = retire_device(&db, ctx.device.id, None, None).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_device() -> Result<()> {
        let db = setup_test_db().await?;
        assert!(get_device_by_id(&db, 99).await?.is_none());
        let result = device_movements(&db, 99).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }
}
