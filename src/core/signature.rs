//! Signature tokens - single-use links that let an analyst sign or reject an
//! acta without an account.

use crate::{
    config::Settings,
    core::{
        acta::{self, ActaDetail},
        analyst,
        status::{ActaStatus, AssetClass},
    },
    entities::{SignatureToken, acta as acta_entity, signature_token},
    errors::{Error, Result},
    notify::{self, Mailer},
};
use chrono::Duration;
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Serialize;

/// Outcome of sending a signature request
#[derive(Debug, Clone, Serialize)]
pub struct SignatureRequest {
    /// The issued token row
    #[serde(skip)]
    pub token: signature_token::Model,
    /// Link mailed to the analyst
    pub enlace: String,
    /// Whether the mail was accepted for delivery
    pub correo_enviado: bool,
}

/// Public link for a token.
#[must_use]
pub fn signature_link(public_base_url: &str, token: &str) -> String {
    format!("{}/firma/{token}", public_base_url.trim_end_matches('/'))
}

/// Issues a new token for an acta, revoking any unused one first.
pub async fn issue_token<C>(
    db: &C,
    acta_id: i64,
    email: &str,
    ttl_hours: i64,
) -> Result<signature_token::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now().naive_utc();
    let expires_at = Duration::try_hours(ttl_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| Error::Config {
            message: format!("Signature link lifetime out of range: {ttl_hours} hours"),
        })?;

    acta::revoke_open_tokens(db, acta_id).await?;
    let token = signature_token::ActiveModel {
        token: Set(uuid::Uuid::new_v4().simple().to_string()),
        acta_id: Set(acta_id),
        email: Set(email.to_string()),
        expires_at: Set(expires_at),
        used_at: Set(None),
        revoked: Set(false),
        created_at: Set(now),
        ..Default::default()
    };
    token.insert(db).await.map_err(Into::into)
}

/// Issues a token for a pending acta and mails the link to its analyst.
///
/// Mail failure is reported through `correo_enviado`; the token stays valid.
pub async fn request_signature(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    settings: &Settings,
    acta_id: i64,
) -> Result<SignatureRequest> {
    let txn = db.begin().await?;
    let pending = acta::get_acta_by_id(&txn, acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", acta_id))?;
    if pending.estado != ActaStatus::PendienteFirma.as_str() {
        return Err(Error::conflict(format!(
            "Acta {acta_id} is {} and cannot be signed",
            pending.estado
        )));
    }
    let analyst = analyst::get_analyst_by_id(&txn, pending.analista_id)
        .await?
        .ok_or_else(|| Error::not_found("analyst", pending.analista_id))?;

    let token = issue_token(
        &txn,
        acta_id,
        &analyst.email,
        settings.signature_token_ttl_hours,
    )
    .await?;
    txn.commit().await?;

    let enlace = signature_link(&settings.public_base_url, &token.token);
    let message = notify::signature_request(&settings.mail_from, &pending, &analyst, &enlace);
    let correo_enviado = match mailer.send(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Signature request for acta {acta_id} not delivered: {e}");
            false
        }
    };

    Ok(SignatureRequest {
        token,
        enlace,
        correo_enviado,
    })
}

/// Re-sends the signature request of a pending acta with a fresh token.
///
/// With `expected_class`, the acta must belong to that asset class. Unlike
/// creation, a mail failure here is an error.
#[tracing::instrument(skip(db, mailer, settings))]
pub async fn resend(
    db: &DatabaseConnection,
    mailer: &dyn Mailer,
    settings: &Settings,
    acta_id: i64,
    expected_class: Option<AssetClass>,
) -> Result<SignatureRequest> {
    if let Some(expected) = expected_class {
        let pending = acta::get_acta_by_id(db, acta_id)
            .await?
            .ok_or_else(|| Error::not_found("acta", acta_id))?;
        if pending.clase != expected.as_str() {
            return Err(Error::validation(format!(
                "Acta {acta_id} covers {}, not {expected}",
                pending.clase
            )));
        }
    }

    let request = request_signature(db, mailer, settings, acta_id).await?;
    if !request.correo_enviado {
        return Err(Error::Mail {
            message: format!("signature request for acta {acta_id} could not be sent"),
        });
    }
    Ok(request)
}

/// Looks a token up and checks it can still be used.
pub async fn resolve<C>(db: &C, token: &str) -> Result<(signature_token::Model, acta_entity::Model)>
where
    C: ConnectionTrait,
{
    let row = SignatureToken::find()
        .filter(signature_token::Column::Token.eq(token))
        .one(db)
        .await?
        .ok_or_else(|| Error::NotFound {
            entity: "signature token",
            id: token.to_string(),
        })?;

    if row.used_at.is_some() || row.revoked {
        return Err(Error::TokenUsed);
    }
    if row.expires_at <= chrono::Utc::now().naive_utc() {
        return Err(Error::TokenExpired);
    }

    let pending = acta::get_acta_by_id(db, row.acta_id)
        .await?
        .ok_or_else(|| Error::not_found("acta", row.acta_id))?;
    if pending.estado != ActaStatus::PendienteFirma.as_str() {
        return Err(Error::conflict(format!(
            "Acta {} is no longer pending signature",
            pending.id
        )));
    }
    Ok((row, pending))
}

/// Acta shown to the holder of a valid token.
pub async fn view(db: &DatabaseConnection, token: &str) -> Result<ActaDetail> {
    let (_, pending) = resolve(db, token).await?;
    acta::get_acta(db, pending.id)
        .await?
        .ok_or_else(|| Error::not_found("acta", pending.id))
}

/// Marks the token used and revokes the acta's other open tokens.
async fn consume(txn: &DatabaseTransaction, token: &signature_token::Model) -> Result<()> {
    let affected = SignatureToken::update_many()
        .col_expr(
            signature_token::Column::UsedAt,
            Expr::value(Some(chrono::Utc::now().naive_utc())),
        )
        .filter(signature_token::Column::Id.eq(token.id))
        .filter(signature_token::Column::UsedAt.is_null())
        .filter(signature_token::Column::Revoked.eq(false))
        .exec(txn)
        .await?
        .rows_affected;
    if affected == 0 {
        return Err(Error::TokenUsed);
    }
    acta::revoke_open_tokens(txn, token.acta_id).await?;
    Ok(())
}

/// Signs the token's acta and applies its effects, consuming the token.
#[tracing::instrument(skip(db, token))]
pub async fn sign_with_token(
    db: &DatabaseConnection,
    token: &str,
    firmante: &str,
) -> Result<acta_entity::Model> {
    let firmante = acta::required_text("Signer name", firmante)?;

    let txn = db.begin().await?;
    let (row, pending) = resolve(&txn, token).await?;
    consume(&txn, &row).await?;
    acta::apply_signature(&txn, &pending, firmante, None).await?;
    let signed = acta::get_acta_by_id(&txn, pending.id)
        .await?
        .ok_or_else(|| Error::not_found("acta", pending.id))?;
    txn.commit().await?;

    tracing::info!("Acta {} signed through emailed link", signed.id);
    Ok(signed)
}

/// Rejects the token's acta, consuming the token.
#[tracing::instrument(skip(db, token))]
pub async fn reject_with_token(
    db: &DatabaseConnection,
    token: &str,
    motivo: &str,
) -> Result<acta_entity::Model> {
    let motivo = acta::required_text("Rejection reason", motivo)?;

    let txn = db.begin().await?;
    let (row, pending) = resolve(&txn, token).await?;
    consume(&txn, &row).await?;
    acta::apply_rejection(&txn, &pending, motivo).await?;
    let rejected = acta::get_acta_by_id(&txn, pending.id)
        .await?
        .ok_or_else(|| Error::not_found("acta", pending.id))?;
    txn.commit().await?;

    tracing::info!("Acta {} rejected through emailed link", rejected.id);
    Ok(rejected)
}
