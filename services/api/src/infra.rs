use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use solar_verify::config::MailConfig;
use solar_verify::workflows::delivery::{
    EmailAddress, MailerError, OutboundEmail, ReportMailer,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const RESEND_API_URL: &str = "https://api.resend.com/emails";
const MAIL_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Sends through the Resend HTTP API.
pub(crate) struct ResendMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub(crate) fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: RESEND_API_URL.to_string(),
            api_key: api_key.into(),
            from: from.into(),
        }
    }

    fn payload(&self, email: &OutboundEmail) -> serde_json::Value {
        let mut payload = json!({
            "from": self.from,
            "to": [email.to],
            "subject": email.subject,
            "html": email.html,
        });
        if let Some(attachment) = &email.attachment {
            payload["attachments"] = json!([{
                "filename": attachment.filename,
                "content": STANDARD.encode(&attachment.content),
                "content_type": attachment.content_type,
            }]);
        }
        payload
    }
}

#[async_trait]
impl ReportMailer for ResendMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(MAIL_TIMEOUT)
            .json(&self.payload(&email))
            .send()
            .await
            .map_err(|err| MailerError::Transport(err.to_string()))?;

        let status = response.status().as_u16();
        if matches!(status, 200 | 201) {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailerError::Rejected { status, body })
    }
}

/// Development transport: logs instead of sending.
#[derive(Default)]
pub(crate) struct LogMailer;

#[async_trait]
impl ReportMailer for LogMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        let recipient = EmailAddress::parse(&email.to)
            .map(|address| address.fingerprint())
            .unwrap_or_else(|_| "invalid".to_string());
        info!(to = %recipient, subject = %email.subject, "email not sent (no RESEND_API_KEY)");
        debug!(html = %email.html, "email body");
        Ok(())
    }
}

/// Mail transport chosen at startup.
pub(crate) enum AppMailer {
    Resend(ResendMailer),
    Log(LogMailer),
}

impl AppMailer {
    pub(crate) fn from_config(config: &MailConfig) -> Self {
        match &config.resend_api_key {
            Some(key) => {
                Self::Resend(ResendMailer::new(key.clone(), config.from_address.clone()))
            }
            None => Self::Log(LogMailer),
        }
    }

    pub(crate) fn transport(&self) -> &'static str {
        match self {
            Self::Resend(_) => "resend",
            Self::Log(_) => "log",
        }
    }
}

#[async_trait]
impl ReportMailer for AppMailer {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError> {
        match self {
            Self::Resend(mailer) => mailer.send(email).await,
            Self::Log(mailer) => mailer.send(email).await,
        }
    }
}
