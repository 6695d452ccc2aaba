//! Shared test utilities.
//!
//! Helpers for setting up an in-memory database and creating records with
//! sensible defaults.

use crate::{
    api::AppState,
    config::Settings,
    core::{
        acta::{self, NewActa, NewActaItem},
        analyst::{self, NewAnalyst},
        device::{self, NewDevice},
        status::{ActaKind, AssetClass, Role},
        stock::{self, NewConsumable, NewFurniture},
        user::{self, NewUser},
    },
    entities,
    errors::{Error, Result},
    notify::{MailMessage, Mailer},
    storage::UploadStore,
};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::{path::Path, sync::Arc, sync::Mutex};

/// Password given to every test user
pub const TEST_PASSWORD: &str = "password123";

/// Creates an in-memory `SQLite` database with all tables initialized.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a back-office user with [`TEST_PASSWORD`].
pub async fn create_test_user(
    db: &DatabaseConnection,
    email: &str,
    rol: Role,
) -> Result<entities::user::Model> {
    user::create_user(
        db,
        NewUser {
            nombre: "Operadora de Prueba".to_string(),
            email: email.to_string(),
            password: TEST_PASSWORD.to_string(),
            rol: Some(rol),
        },
    )
    .await
}

/// Creates an analyst named `nombre` with email `<nombre>@example.com` (lowercased).
pub async fn create_test_analyst(
    db: &DatabaseConnection,
    nombre: &str,
) -> Result<entities::analyst::Model> {
    analyst::create_analyst(
        db,
        NewAnalyst {
            nombre: nombre.to_string(),
            email: format!("{}@example.com", nombre.to_lowercase()),
            documento: None,
            departamento: Some("Soporte".to_string()),
            cargo: None,
        },
    )
    .await
}

/// A laptop with the given serial number.
pub fn sample_device(numero_serie: &str) -> NewDevice {
    NewDevice {
        tipo: "Laptop".to_string(),
        marca: "Lenovo".to_string(),
        modelo: "ThinkPad T14".to_string(),
        numero_serie: numero_serie.to_string(),
        ubicacion: None,
        observaciones: None,
    }
}

/// Registers [`sample_device`] as `disponible`.
pub async fn create_test_device(
    db: &DatabaseConnection,
    numero_serie: &str,
) -> Result<entities::device::Model> {
    device::create_device(db, sample_device(numero_serie), None).await
}

/// Creates a consumable with the given stock and a threshold of 1.
pub async fn create_test_consumable(
    db: &DatabaseConnection,
    nombre: &str,
    stock: i32,
) -> Result<entities::consumable::Model> {
    stock::create_consumable(
        db,
        NewConsumable {
            nombre: nombre.to_string(),
            categoria: "Impresión".to_string(),
            unidad: None,
            stock,
            stock_minimo: 1,
        },
        None,
    )
    .await
}

/// Creates a furniture item with the given stock and a threshold of 1.
pub async fn create_test_furniture(
    db: &DatabaseConnection,
    nombre: &str,
    stock: i32,
) -> Result<entities::furniture::Model> {
    stock::create_furniture(
        db,
        NewFurniture {
            nombre: nombre.to_string(),
            tipo: "Oficina".to_string(),
            ubicacion: None,
            stock,
            stock_minimo: 1,
        },
        None,
    )
    .await
}

/// An operator and an analyst named Bruno
pub struct TestContext {
    /// Operator creating actas
    pub user: entities::user::Model,
    /// Analyst receiving assets
    pub analyst: entities::analyst::Model,
}

/// Database with an operator and one analyst.
pub async fn setup_with_analyst() -> Result<(DatabaseConnection, TestContext)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "operadora@example.com", Role::Operador).await?;
    let analyst = create_test_analyst(&db, "Bruno").await?;
    Ok((db, TestContext { user, analyst }))
}

/// [`TestContext`] plus a device and an acta covering it
pub struct ActaContext {
    /// Operator who opened the acta
    pub user: entities::user::Model,
    /// Analyst named on the acta
    pub analyst: entities::analyst::Model,
    /// Device listed on the acta
    pub device: entities::device::Model,
    /// The acta
    pub acta_id: i64,
}

/// Database with a pending hand-off acta for one device.
pub async fn setup_with_pending_device_acta() -> Result<(DatabaseConnection, ActaContext)> {
    let (db, TestContext { user, analyst }) = setup_with_analyst().await?;
    let device = create_test_device(&db, "SN-TEST-1").await?;
    let created = acta::create_acta(
        &db,
        NewActa {
            tipo: ActaKind::Entrega,
            clase: AssetClass::Dispositivo,
            analista_id: analyst.id,
            observaciones: None,
            items: vec![NewActaItem {
                item_id: device.id,
                cantidad: 1,
            }],
        },
        user.id,
    )
    .await?;

    Ok((
        db,
        ActaContext {
            user,
            analyst,
            device,
            acta_id: created.id,
        },
    ))
}

/// Database where the device of [`setup_with_pending_device_acta`] has been
/// handed out through a signed acta.
pub async fn setup_with_assigned_device() -> Result<(DatabaseConnection, ActaContext)> {
    let (db, ctx) = setup_with_pending_device_acta().await?;
    acta::sign_acta(&db, ctx.acta_id, "Bruno", Some(ctx.user.id)).await?;
    Ok((db, ctx))
}

/// Mailer that keeps messages in memory, or fails every delivery
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<MailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    /// A mailer whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            fail: true,
        }
    }

    /// Messages delivered so far.
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        if self.fail {
            return Err(Error::Mail {
                message: "relay unavailable".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

/// Settings suitable for tests; no file or environment involved.
pub fn test_settings() -> Settings {
    Settings {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_hours: 1,
        signature_token_ttl_hours: 24,
        public_base_url: "http://inventario.test".to_string(),
        upload_dir: "uploads".into(),
        max_upload_bytes: 1024 * 1024,
        mail_from: "inventario@example.com".to_string(),
        mail_webhook_url: None,
        admin: None,
    }
}

/// Application state over `db`, storing uploads under `upload_root`.
pub fn test_state(
    db: DatabaseConnection,
    mailer: Arc<dyn Mailer>,
    upload_root: &Path,
) -> AppState {
    AppState {
        db,
        settings: Arc::new(test_settings()),
        mailer,
        uploads: UploadStore::new(upload_root),
    }
}
