use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use super::address::{AddressError, EmailAddress};
use super::mailer::{MailerError, ReportMailer};
use super::report;
use super::store::{CodeRecord, CodeStore, StoreError};

pub const CODE_LENGTH: usize = 6;

/// Code issuance acknowledgement; the code itself only leaves the process by email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub email_hash: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Six-digit email verification with an attempt limit.
pub struct CodeVerificationService<C, M> {
    store: Arc<C>,
    mailer: Arc<M>,
    ttl: Duration,
    max_attempts: u32,
}

impl<C, M> CodeVerificationService<C, M>
where
    C: CodeStore + 'static,
    M: ReportMailer + 'static,
{
    pub fn new(store: Arc<C>, mailer: Arc<M>, ttl: Duration, max_attempts: u32) -> Self {
        Self {
            store,
            mailer,
            ttl,
            max_attempts,
        }
    }

    /// Generate and email a fresh code. Re-sending replaces the previous code and resets the
    /// attempt counter.
    pub async fn send_code(&self, email: &str) -> Result<IssuedCode, CodeVerificationError> {
        let email = EmailAddress::parse(email)?;
        let code = generate_code();
        let now = Utc::now();
        let email_hash = email.hash();

        self.store.upsert(CodeRecord {
            email_hash: email_hash.clone(),
            code: code.clone(),
            created_at: now,
            attempts: 0,
            verified: false,
        })?;

        let message = report::verification_code_email(&email, &code, self.ttl.num_minutes());
        if let Err(error) = self.mailer.send(message).await {
            warn!(email = %email.fingerprint(), %error, "verification code email failed");
            return Err(CodeVerificationError::Delivery(error));
        }

        info!(email = %email.fingerprint(), "verification code sent");
        Ok(IssuedCode {
            email_hash,
            code,
            expires_at: now + self.ttl,
        })
    }

    pub fn verify_code(&self, email: &str, code: &str) -> Result<(), CodeVerificationError> {
        self.verify_code_at(email, code, Utc::now())
    }

    /// The attempt counter is incremented and checked before the code is compared, so guesses
    /// past the limit are refused even when correct.
    pub fn verify_code_at(
        &self,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CodeVerificationError> {
        let email = EmailAddress::parse(email)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(CodeVerificationError::MissingCode);
        }

        let email_hash = email.hash();
        let record = self
            .store
            .register_attempt(&email_hash)?
            .ok_or(CodeVerificationError::InvalidCode)?;

        if record.attempts > self.max_attempts {
            warn!(
                email = %email.fingerprint(),
                attempts = record.attempts,
                "verification rate limited"
            );
            return Err(CodeVerificationError::RateLimited);
        }

        if !codes_match(&record.code, code) {
            return Err(CodeVerificationError::InvalidCode);
        }

        if now - record.created_at > self.ttl {
            return Err(CodeVerificationError::Expired);
        }

        self.store.mark_verified(&email_hash)?;
        info!(email = %email.fingerprint(), "email verified");
        Ok(())
    }
}

/// Constant-time for equal-length inputs; the length itself is public.
fn codes_match(expected: &str, supplied: &str) -> bool {
    bool::from(expected.as_bytes().ct_eq(supplied.as_bytes()))
}

fn generate_code() -> String {
    let value = Uuid::new_v4().as_u128() % 10u128.pow(CODE_LENGTH as u32);
    format!("{value:0width$}", width = CODE_LENGTH)
}

#[derive(Debug, thiserror::Error)]
pub enum CodeVerificationError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("Email and verification code are required")]
    MissingCode,
    #[error("Invalid verification code")]
    InvalidCode,
    #[error("Verification code expired")]
    Expired,
    #[error("Too many verification attempts")]
    RateLimited,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to send email: {0}")]
    Delivery(#[source] MailerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_comparison_requires_exact_match() {
        assert!(codes_match("042917", "042917"));
        assert!(!codes_match("042917", "042918"));
        assert!(!codes_match("042917", "42917"));
        assert!(!codes_match("042917", "0429170"));
        assert!(!codes_match("042917", ""));
    }
}
