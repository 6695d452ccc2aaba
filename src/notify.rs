//! Outgoing mail.
//!
//! The only mail this service sends is the signature request carrying a
//! single-use link. Delivery goes through the [`Mailer`] trait: [`LogMailer`]
//! writes the message to the log (development), [`WebhookMailer`] posts it as
//! JSON to a relay endpoint.

use crate::{
    config::Settings,
    entities::{acta, analyst},
    errors::{Error, Result},
};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// How long the relay gets to accept a message.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// A plain-text email
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MailMessage {
    /// Sender
    pub from: String,
    /// Recipient
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Logs messages instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        tracing::info!(
            to = %message.to,
            subject = %message.subject,
            "Mail not delivered (no mail webhook configured):\n{}",
            message.body
        );
        Ok(())
    }
}

/// Posts messages as JSON to an HTTP mail relay
#[derive(Debug, Clone)]
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    /// Creates a mailer posting to `url`, giving up after `timeout`.
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("Failed to build mail client: {e}"),
            })?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| Error::Mail {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Mail {
                message: format!("mail relay answered {status}"),
            });
        }
        tracing::debug!("Mail to {} accepted by relay", message.to);
        Ok(())
    }
}

/// Picks the mailer configured in `settings`.
pub fn mailer_from_settings(settings: &Settings) -> Result<Arc<dyn Mailer>> {
    Ok(match &settings.mail_webhook_url {
        Some(url) => Arc::new(WebhookMailer::new(url.clone(), RELAY_TIMEOUT)?),
        None => Arc::new(LogMailer),
    })
}

/// Builds the signature request sent to the analyst named on an acta.
#[must_use]
pub fn signature_request(
    from: &str,
    acta: &acta::Model,
    analyst: &analyst::Model,
    link: &str,
) -> MailMessage {
    let accion = if acta.tipo == "devolucion" {
        "devolución"
    } else {
        "entrega"
    };

    MailMessage {
        from: from.to_string(),
        to: analyst.email.clone(),
        subject: format!("Acta de {accion} N° {} pendiente de firma", acta.id),
        body: format!(
            "Hola {nombre},\n\n\
             Tienes un acta de {accion} de {clase} (N° {id}) pendiente de firma.\n\
             Revísala y fírmala o recházala en el siguiente enlace:\n\n\
             {link}\n\n\
             El enlace es de un solo uso.\n",
            nombre = analyst.nombre,
            clase = acta.clase,
            id = acta.id,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_acta(tipo: &str) -> acta::Model {
        let now = chrono::Utc::now().naive_utc();
        acta::Model {
            id: 12,
            tipo: tipo.to_string(),
            clase: "dispositivo".to_string(),
            analista_id: 3,
            estado: "pendiente_firma".to_string(),
            observaciones: None,
            creado_por: 1,
            firmante: None,
            motivo_rechazo: None,
            documento: None,
            created_at: now,
            updated_at: now,
            cerrada_at: None,
        }
    }

    fn sample_analyst() -> analyst::Model {
        let now = chrono::Utc::now().naive_utc();
        analyst::Model {
            id: 3,
            nombre: "Bruno".to_string(),
            email: "bruno@example.com".to_string(),
            documento: None,
            departamento: None,
            cargo: None,
            activo: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_signature_request_message() {
        let message = signature_request(
            "inventario@example.com",
            &sample_acta("entrega"),
            &sample_analyst(),
            "https://app/firma/abc",
        );

        assert_eq!(message.to, "bruno@example.com");
        assert_eq!(message.from, "inventario@example.com");
        assert!(message.subject.contains("entrega"));
        assert!(message.subject.contains("12"));
        assert!(message.body.contains("https://app/firma/abc"));
        assert!(message.body.contains("Bruno"));
    }

    #[test]
    fn test_return_subject() {
        let message = signature_request("a@b.c", &sample_acta("devolucion"), &sample_analyst(), "x");
        assert!(message.subject.contains("devolución"));
    }

    #[tokio::test]
    async fn test_log_mailer_accepts_everything() {
        let message = signature_request("a@b.c", &sample_acta("entrega"), &sample_analyst(), "x");
        assert!(LogMailer.send(&message).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_mailer_gives_up_on_stalled_relay() -> Result<()> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let relay = tokio::spawn(async move {
            // Accept and hold the connection without answering.
            let held = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(held);
        });

        let mailer = WebhookMailer::new(format!("http://{addr}/send"), Duration::from_millis(200))?;
        let message = signature_request("a@b.c", &sample_acta("entrega"), &sample_analyst(), "x");
        let started = std::time::Instant::now();
        let result = mailer.send(&message).await;

        assert!(matches!(result, Err(Error::Mail { .. })));
        assert!(started.elapsed() < Duration::from_secs(10));
        relay.abort();
        Ok(())
    }
}
