//! `/api/actas` - custody records, their signature requests and signed scans.

use crate::{
    api::{
        AppState,
        auth::AuthUser,
        extract::{ApiJson, ApiMultipart, ApiPath, ApiQuery},
    },
    core::{
        acta::{self, ActaDetail, ActaFilter, NewActa},
        signature::{self, SignatureRequest},
        status::{ActaStatus, AssetClass},
    },
    entities::acta as acta_entity,
    errors::{Error, Result},
    storage,
};
use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Response of POST /api/actas
#[derive(Debug, Serialize)]
pub struct ActaCreated {
    /// The new acta
    #[serde(flatten)]
    pub acta: ActaDetail,
    /// Signature link sent to the analyst
    pub enlace: String,
    /// Whether the mail was accepted for delivery
    pub correo_enviado: bool,
}

/// Body of POST /api/actas/{id}/firmar
#[derive(Debug, Deserialize)]
pub struct SignBody {
    /// Name of the person signing
    pub firmante: String,
}

/// Body of POST /api/actas/{id}/rechazar
#[derive(Debug, Deserialize)]
pub struct RejectBody {
    /// Reason for rejection
    pub motivo: String,
}

fn not_found(id: i64) -> Error {
    Error::not_found("acta", id)
}

/// GET /api/actas
pub async fn list(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(filter): ApiQuery<ActaFilter>,
) -> Result<Json<Vec<acta_entity::Model>>> {
    Ok(Json(acta::list_actas(&state.db, &filter).await?))
}

/// GET /api/actas/{id}
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<ActaDetail>> {
    acta::get_acta(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

/// POST /api/actas
///
/// Opens the acta and mails the signature link. A mail failure does not undo
/// the acta; it is reported through `correo_enviado`.
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(input): ApiJson<NewActa>,
) -> Result<(StatusCode, Json<ActaCreated>)> {
    let created = acta::create_acta(&state.db, input, user.id).await?;
    let request = signature::request_signature(
        &state.db,
        state.mailer.as_ref(),
        &state.settings,
        created.id,
    )
    .await?;
    let detail = acta::get_acta(&state.db, created.id)
        .await?
        .ok_or_else(|| not_found(created.id))?;

    Ok((
        StatusCode::CREATED,
        Json(ActaCreated {
            acta: detail,
            enlace: request.enlace,
            correo_enviado: request.correo_enviado,
        }),
    ))
}

/// POST /api/actas/{id}/firmar
///
/// Signature collected in person, e.g. on a printed copy.
pub async fn sign(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<SignBody>,
) -> Result<Json<acta_entity::Model>> {
    Ok(Json(
        acta::sign_acta(&state.db, id, &body.firmante, Some(user.id)).await?,
    ))
}

/// POST /api/actas/{id}/rechazar
pub async fn reject(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<RejectBody>,
) -> Result<Json<acta_entity::Model>> {
    Ok(Json(
        acta::reject_acta(&state.db, id, &body.motivo, Some(user.id)).await?,
    ))
}

async fn resend_checked(
    state: &AppState,
    id: i64,
    clase: Option<AssetClass>,
) -> Result<Json<SignatureRequest>> {
    let request = signature::resend(
        &state.db,
        state.mailer.as_ref(),
        &state.settings,
        id,
        clase,
    )
    .await?;
    Ok(Json(request))
}

/// POST /api/actas/{id}/reenviar
pub async fn resend(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SignatureRequest>> {
    resend_checked(&state, id, None).await
}

/// POST /actaConsumible/{id}/reenviar
pub async fn resend_consumable(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SignatureRequest>> {
    resend_checked(&state, id, Some(AssetClass::Consumible)).await
}

/// POST /actaDispositivo/{id}/reenviar
pub async fn resend_device(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SignatureRequest>> {
    resend_checked(&state, id, Some(AssetClass::Dispositivo)).await
}

/// POST /actaMueble/{id}/reenviar
pub async fn resend_furniture(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<SignatureRequest>> {
    resend_checked(&state, id, Some(AssetClass::Mueble)).await
}

/// POST /api/actas/{id}/documento
///
/// Takes the first file part of a multipart body.
pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(id): ApiPath<i64>,
    ApiMultipart(mut multipart): ApiMultipart,
) -> Result<Json<acta_entity::Model>> {
    let current = acta::get_acta_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if current.estado == ActaStatus::Rechazada.as_str() {
        return Err(Error::conflict(format!(
            "Acta {id} was rejected and cannot take a document"
        )));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::validation(e.body_text()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::validation(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) = upload.ok_or_else(|| Error::validation("No file in upload"))?;

    let path = state.uploads.save(id, &filename, &bytes).await?;
    let updated = match acta::attach_document(&state.db, id, path.clone()).await {
        Ok(updated) => updated,
        Err(e) => {
            discard(&state, &path).await;
            return Err(e);
        }
    };
    if let Some(previous) = current.documento.filter(|p| *p != path) {
        discard(&state, &previous).await;
    }
    tracing::info!("{} attached document {filename} to acta {id}", user.email);
    Ok(Json(updated))
}

async fn discard(state: &AppState, path: &str) {
    if let Err(e) = state.uploads.remove(path).await {
        tracing::warn!("Could not remove stored document {path}: {e}");
    }
}

/// GET /api/actas/{id}/documento
pub async fn download_document(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(id): ApiPath<i64>,
) -> Result<Response> {
    let current = acta::get_acta_by_id(&state.db, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let path = current.documento.ok_or_else(|| Error::NotFound {
        entity: "document",
        id: format!("acta {id}"),
    })?;

    let bytes = state.uploads.read(&path).await?;
    let extension = path.rsplit('.').next().unwrap_or("bin");
    let headers = [
        (header::CONTENT_TYPE, storage::content_type(&path).to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"acta-{id}.{extension}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}
