use async_trait::async_trait;
use serde::Serialize;

/// Optional file attached to an outbound email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    #[serde(skip)]
    pub content: Vec<u8>,
}

/// Rendered email ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// Outbound email collaborator. Delivery must either succeed or return an error; a transport
/// that cannot confirm acceptance reports failure.
#[async_trait]
pub trait ReportMailer: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail provider rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("mail transport failed: {0}")]
    Transport(String),
}
