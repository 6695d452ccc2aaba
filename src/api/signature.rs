//! `/api/firma/{token}` - public signing page backend.
//!
//! No session: the emailed token is the credential.

use crate::{
    api::{
        AppState,
        actas::{RejectBody, SignBody},
        extract::{ApiJson, ApiPath},
    },
    core::{acta::ActaDetail, signature},
    entities::acta as acta_entity,
    errors::Result,
};
use axum::{
    Json,
    extract::State,
};

/// GET /api/firma/{token}
pub async fn view(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
) -> Result<Json<ActaDetail>> {
    Ok(Json(signature::view(&state.db, &token).await?))
}

/// POST /api/firma/{token}/firmar
pub async fn sign(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<SignBody>,
) -> Result<Json<acta_entity::Model>> {
    Ok(Json(
        signature::sign_with_token(&state.db, &token, &body.firmante).await?,
    ))
}

/// POST /api/firma/{token}/rechazar
pub async fn reject(
    State(state): State<AppState>,
    ApiPath(token): ApiPath<String>,
    ApiJson(body): ApiJson<RejectBody>,
) -> Result<Json<acta_entity::Model>> {
    Ok(Json(
        signature::reject_with_token(&state.db, &token, &body.motivo).await?,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::send;
    use crate::core::signature::issue_token;
    use crate::errors::Result;
    use crate::test_utils::*;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_public_rejection_and_token_errors() -> Result<()> {
        let (db, ctx) = setup_with_pending_device_acta().await?;
        let stale = issue_token(&db, ctx.acta_id, &ctx.analyst.email, 24).await?;
        let token = issue_token(&db, ctx.acta_id, &ctx.analyst.email, 24).await?;
        let dir = tempfile::tempdir()?;
        let app = crate::api::router(test_state(
            db,
            Arc::new(RecordingMailer::default()),
            dir.path(),
        ));

        let (status, _) = send(&app, "GET", "/api/firma/desconocido", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Issuing the second token revoked the first one.
        let stale_uri = format!("/api/firma/{}", stale.token);
        let (status, _) = send(&app, "GET", &stale_uri, None, None).await;
        assert_eq!(status, StatusCode::GONE);

        let reject_uri = format!("/api/firma/{}/rechazar", token.token);
        let (status, _) = send(&app, "POST", &reject_uri, None, Some(json!({"motivo": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let motivo = Some(json!({"motivo": "No corresponde"}));
        let (status, body) = send(&app, "POST", &reject_uri, None, motivo.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estado"], "rechazada");
        assert_eq!(body["motivo_rechazo"], "No corresponde");

        let (status, _) = send(&app, "POST", &reject_uri, None, motivo).await;
        assert_eq!(status, StatusCode::GONE);
        Ok(())
    }
}
