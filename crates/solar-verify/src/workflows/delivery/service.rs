use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::address::{AddressError, EmailAddress};
use super::mailer::{MailerError, ReportMailer};
use super::report;
use super::store::{AnalysisStore, DeliveryGate, DeliveryState, StoreError, StoredAnalysis};
use super::token::{AnalysisSnapshot, TokenError, TokenId, TokenService};

/// Magic-link issuance acknowledgement. The encoded token only leaves the process by email.
#[derive(Debug, Clone, PartialEq)]
pub struct IssuedLink {
    pub token_id: TokenId,
    pub token: String,
    pub link: String,
    pub expires_at: DateTime<Utc>,
}

/// What the delivery gate did during a verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    /// This call sent the report.
    Sent,
    /// An earlier call already sent it.
    AlreadySent,
    /// Another call holds the gate and is sending right now.
    InProgress,
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerifiedAnalysis {
    pub email: EmailAddress,
    pub analysis_snapshot: AnalysisSnapshot,
    pub delivery: DeliveryOutcome,
}

/// Token issuance, verification, and once-only report delivery.
pub struct MagicLinkService<S, G, M> {
    tokens: TokenService,
    store: Arc<S>,
    gate: Arc<G>,
    mailer: Arc<M>,
    public_url: String,
}

impl<S, G, M> MagicLinkService<S, G, M>
where
    S: AnalysisStore + 'static,
    G: DeliveryGate + 'static,
    M: ReportMailer + 'static,
{
    pub fn new(
        tokens: TokenService,
        store: Arc<S>,
        gate: Arc<G>,
        mailer: Arc<M>,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            tokens,
            store,
            gate,
            mailer,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Issue a token for `email`, persist the snapshot, and email the link.
    pub async fn send_link(
        &self,
        email: &str,
        snapshot: AnalysisSnapshot,
    ) -> Result<IssuedLink, MagicLinkError> {
        let email = EmailAddress::parse(email)?;
        let issued = self.tokens.issue(&email, snapshot)?;
        let claims = issued.claims;
        let token_id = claims.jti;
        let link = format!("{}/verify?token={}", self.public_url, issued.token);

        self.store.put(StoredAnalysis {
            token_id,
            email: email.clone(),
            snapshot: claims.snapshot,
            issued_at: claims.iat,
            token: issued.token.clone(),
        })?;

        let message = report::magic_link_email(&email, &link, claims.exp);
        if let Err(error) = self.mailer.send(message).await {
            warn!(%token_id, email = %email.fingerprint(), %error, "magic link email failed");
            self.store.remove(&token_id)?;
            return Err(MagicLinkError::Delivery(error));
        }

        info!(
            %token_id,
            email = %email.fingerprint(),
            expires_at = %claims.exp,
            "magic link issued"
        );
        Ok(IssuedLink {
            token_id,
            token: issued.token,
            link,
            expires_at: claims.exp,
        })
    }

    pub async fn verify_link(&self, token: &str) -> Result<VerifiedAnalysis, MagicLinkError> {
        self.verify_link_at(token, Utc::now()).await
    }

    /// Verify a token and return its analysis. Safe to call any number of times; the report
    /// email is sent by at most one call per token.
    pub async fn verify_link_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<VerifiedAnalysis, MagicLinkError> {
        let claims = self.tokens.verify_at(token, now)?;
        let record = self
            .store
            .fetch(&claims.jti)?
            .ok_or(MagicLinkError::NotFound)?;

        let delivery = self.deliver_once(&record).await?;

        Ok(VerifiedAnalysis {
            email: record.email,
            analysis_snapshot: record.snapshot,
            delivery,
        })
    }

    async fn deliver_once(
        &self,
        record: &StoredAnalysis,
    ) -> Result<DeliveryOutcome, MagicLinkError> {
        let id = record.token_id;
        let claimed =
            self.gate
                .compare_and_set(&id, DeliveryState::Pending, DeliveryState::InFlight)?;
        if !claimed {
            let outcome = match self.gate.state(&id)? {
                DeliveryState::Fired => DeliveryOutcome::AlreadySent,
                DeliveryState::InFlight | DeliveryState::Pending => DeliveryOutcome::InProgress,
            };
            info!(token_id = %id, ?outcome, "report delivery skipped");
            return Ok(outcome);
        }

        let message = report::report_email(&record.email, &record.snapshot);
        match self.mailer.send(message).await {
            Ok(()) => {
                let recorded = self.gate.compare_and_set(
                    &id,
                    DeliveryState::InFlight,
                    DeliveryState::Fired,
                )?;
                if recorded {
                    info!(token_id = %id, email = %record.email.fingerprint(), "report delivered");
                } else {
                    warn!(
                        token_id = %id,
                        email = %record.email.fingerprint(),
                        "report delivered but its gate marker was cleared mid-send"
                    );
                }
                Ok(DeliveryOutcome::Sent)
            }
            Err(error) => {
                let released = self.gate.compare_and_set(
                    &id,
                    DeliveryState::InFlight,
                    DeliveryState::Pending,
                )?;
                if !released {
                    warn!(token_id = %id, "gate marker was cleared before release");
                }
                warn!(token_id = %id, %error, "report delivery failed; gate released");
                Err(MagicLinkError::Delivery(error))
            }
        }
    }

    pub fn sweep(&self) -> Result<usize, MagicLinkError> {
        self.sweep_at(Utc::now())
    }

    /// Drop stored analyses whose tokens no longer verify, along with their delivery markers.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize, MagicLinkError> {
        let mut removed = 0;
        for entry in self.store.entries()? {
            if self.tokens.verify_at(&entry.token, now).is_err() {
                self.store.remove(&entry.token_id)?;
                self.gate.forget(&entry.token_id)?;
                removed += 1;
            }
        }

        if removed > 0 {
            info!(removed, "swept stale analyses");
        }
        Ok(removed)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MagicLinkError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("analysis snapshot is required")]
    MissingSnapshot,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("no analysis found for this link")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to send email: {0}")]
    Delivery(#[source] MailerError),
}
