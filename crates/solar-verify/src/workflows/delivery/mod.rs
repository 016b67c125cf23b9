//! Token-gated delivery: signed magic links, the ephemeral result store, and the gate that
//! lets a report email fire at most once per token while verification stays repeatable.
//!
//! The numeric six-digit code flow shares the mailer and address handling.

pub mod address;
pub mod codes;
pub mod mailer;
pub mod memory;
mod report;
pub mod router;
pub mod service;
pub mod store;
pub mod token;

#[cfg(test)]
mod tests;

pub use address::{AddressError, EmailAddress};
pub use codes::{CodeVerificationError, CodeVerificationService, IssuedCode};
pub use mailer::{Attachment, MailerError, OutboundEmail, ReportMailer};
pub use memory::{InMemoryAnalysisStore, InMemoryCodeStore, InMemoryDeliveryGate};
pub use router::{magic_link_router, verification_code_router};
pub use service::{DeliveryOutcome, IssuedLink, MagicLinkError, MagicLinkService, VerifiedAnalysis};
pub use store::{
    AnalysisStore, CodeRecord, CodeStore, DeliveryGate, DeliveryState, StoreError, StoredAnalysis,
};
pub use token::{AnalysisSnapshot, IssuedToken, TokenClaims, TokenError, TokenId, TokenService};
