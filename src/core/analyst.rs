//! Analyst business logic - people who receive custody of assets.

use crate::{
    core::{status::DeviceStatus, user::validate_email},
    entities::{Analyst, Device, analyst, device},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Data required to register an analyst
#[derive(Debug, Clone, Deserialize)]
pub struct NewAnalyst {
    /// Full name
    pub nombre: String,
    /// Email for signature links
    pub email: String,
    /// National id or employee number
    #[serde(default)]
    pub documento: Option<String>,
    /// Department
    #[serde(default)]
    pub departamento: Option<String>,
    /// Job title
    #[serde(default)]
    pub cargo: Option<String>,
}

/// Partial update of an analyst; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalystUpdate {
    /// Full name
    pub nombre: Option<String>,
    /// Email for signature links
    pub email: Option<String>,
    /// National id or employee number
    pub documento: Option<String>,
    /// Department
    pub departamento: Option<String>,
    /// Job title
    pub cargo: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Lists analysts ordered by name, optionally including deactivated ones.
pub async fn list_analysts(
    db: &DatabaseConnection,
    include_inactive: bool,
) -> Result<Vec<analyst::Model>> {
    let mut query = Analyst::find();
    if !include_inactive {
        query = query.filter(analyst::Column::Activo.eq(true));
    }
    query
        .order_by_asc(analyst::Column::Nombre)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds an analyst by id.
pub async fn get_analyst_by_id<C>(db: &C, analyst_id: i64) -> Result<Option<analyst::Model>>
where
    C: ConnectionTrait,
{
    Analyst::find_by_id(analyst_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Registers an analyst.
pub async fn create_analyst(db: &DatabaseConnection, input: NewAnalyst) -> Result<analyst::Model> {
    if input.nombre.trim().is_empty() {
        return Err(Error::validation("Analyst name cannot be empty"));
    }
    let email = validate_email(&input.email)?;

    let now = chrono::Utc::now().naive_utc();
    let analyst = analyst::ActiveModel {
        nombre: Set(input.nombre.trim().to_string()),
        email: Set(email),
        documento: Set(non_blank(input.documento)),
        departamento: Set(non_blank(input.departamento)),
        cargo: Set(non_blank(input.cargo)),
        activo: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    analyst.insert(db).await.map_err(Into::into)
}

/// Applies a partial update to an active analyst.
pub async fn update_analyst(
    db: &DatabaseConnection,
    analyst_id: i64,
    changes: AnalystUpdate,
) -> Result<analyst::Model> {
    let current = get_analyst_by_id(db, analyst_id)
        .await?
        .filter(|a| a.activo)
        .ok_or_else(|| Error::not_found("analyst", analyst_id))?;

    let mut analyst: analyst::ActiveModel = current.into();
    if let Some(nombre) = changes.nombre {
        if nombre.trim().is_empty() {
            return Err(Error::validation("Analyst name cannot be empty"));
        }
        analyst.nombre = Set(nombre.trim().to_string());
    }
    if let Some(email) = changes.email {
        analyst.email = Set(validate_email(&email)?);
    }
    if changes.documento.is_some() {
        analyst.documento = Set(non_blank(changes.documento));
    }
    if changes.departamento.is_some() {
        analyst.departamento = Set(non_blank(changes.departamento));
    }
    if changes.cargo.is_some() {
        analyst.cargo = Set(non_blank(changes.cargo));
    }
    analyst.updated_at = Set(chrono::Utc::now().naive_utc());

    analyst.update(db).await.map_err(Into::into)
}

/// Soft deletes an analyst.
///
/// Refused while the analyst still holds assigned devices.
pub async fn deactivate_analyst(db: &DatabaseConnection, analyst_id: i64) -> Result<analyst::Model> {
    let current = get_analyst_by_id(db, analyst_id)
        .await?
        .filter(|a| a.activo)
        .ok_or_else(|| Error::not_found("analyst", analyst_id))?;

    let held = Device::find()
        .filter(device::Column::AnalistaId.eq(analyst_id))
        .filter(device::Column::Estado.eq(DeviceStatus::Asignado.as_str()))
        .count(db)
        .await?;
    if held > 0 {
        return Err(Error::conflict(format!(
            "Analyst {} still holds {held} device(s)",
            current.nombre
        )));
    }

    let mut analyst: analyst::ActiveModel = current.into();
    analyst.activo = Set(false);
    analyst.updated_at = Set(chrono::Utc::now().naive_utc());
    analyst.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_and_list_analysts() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_analyst(&db, "Zoe").await?;
        let bruno = create_test_analyst(&db, "Bruno").await?;

        let analysts = list_analysts(&db, false).await?;
        assert_eq!(analysts.len(), 2);
        assert_eq!(analysts[0], bruno);
        assert_eq!(bruno.email, "bruno@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn test_create_analyst_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_analyst(
            &db,
            NewAnalyst {
                nombre: "Sin correo".to_string(),
                email: "sin-correo".to_string(),
                documento: None,
                departamento: None,
                cargo: None,
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_analyst_partial() -> Result<()> {
        let db = setup_test_db().await?;
        let analyst = create_test_analyst(&db, "Bruno").await?;

        let updated = update_analyst(
            &db,
            analyst.id,
            AnalystUpdate {
                departamento: Some("Soporte".to_string()),
                ..Default::default()
            },
        )
        .await?;

        assert_eq!(updated.nombre, "Bruno");
        assert_eq!(updated.departamento.as_deref(), Some("Soporte"));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_analyst() -> Result<()> {
        let db = setup_test_db().await?;
        let analyst = create_test_analyst(&db, "Bruno").await?;

        let deactivated = deactivate_analyst(&db, analyst.id).await?;
        assert!(!deactivated.activo);
        assert!(list_analysts(&db, false).await?.is_empty());
        assert_eq!(list_analysts(&db, true).await?.len(), 1);

        let again = deactivate_analyst(&db, analyst.id).await;
        assert!(matches!(again.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivate_analyst_holding_devices_conflicts() -> Result<()> {
        let (db, ctx) = setup_with_assigned_device().await?;

        let result = deactivate_analyst(&db, ctx.analyst.id).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));
        Ok(())
    }
}
