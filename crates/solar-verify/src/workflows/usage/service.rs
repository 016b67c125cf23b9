use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::store::{Registration, UsageKey, UsageRecord, UsageStore};
use crate::workflows::delivery::{AddressError, EmailAddress, StoreError};

/// Free checks granted once an address is registered.
pub const FREE_CHECKS_WITH_EMAIL: u32 = 3;
/// Free checks per rolling window for requesters without a registered address.
pub const ANONYMOUS_FREE_CHECKS: u32 = 1;

const ANONYMOUS_WINDOW_HOURS: i64 = 24;

/// Counts analyses per requester. Implemented by [`UsageService`] and consulted by the quote
/// service after a successful analysis.
pub trait AnalysisCounter: Send + Sync {
    /// Running analysis total for `requester`, or `None` when the identifier is blank.
    fn count_analysis(&self, requester: &str) -> Result<Option<u32>, UsageError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisteredUser {
    pub email: EmailAddress,
    pub free_checks_used: u32,
    pub free_checks_remaining: u32,
    pub can_use_free: bool,
    pub total_analyses: u32,
}

impl RegisteredUser {
    fn from_record(registration: &Registration, record: &UsageRecord) -> Self {
        let used = record.free_checks_used();
        Self {
            email: registration.email.clone(),
            free_checks_used: used,
            free_checks_remaining: registration.free_checks_limit.saturating_sub(used),
            can_use_free: used < registration.free_checks_limit,
            total_analyses: record.analyses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailStatus {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<RegisteredUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageTier {
    Registered,
    Anonymous,
    New,
}

/// Free-check allowance for one requester.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageLimits {
    #[serde(rename = "type")]
    pub tier: UsageTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailAddress>,
    pub checks_used: u32,
    pub checks_limit: u32,
    pub can_use_free: bool,
    pub needs_email: bool,
    pub needs_upgrade: bool,
}

impl UsageLimits {
    fn new_requester() -> Self {
        Self {
            tier: UsageTier::New,
            email: None,
            checks_used: 0,
            checks_limit: ANONYMOUS_FREE_CHECKS,
            can_use_free: true,
            needs_email: false,
            needs_upgrade: false,
        }
    }
}

pub struct UsageService<U> {
    store: Arc<U>,
    window: Duration,
}

impl<U> UsageService<U>
where
    U: UsageStore + 'static,
{
    pub fn new(store: Arc<U>) -> Self {
        Self {
            store,
            window: Duration::hours(ANONYMOUS_WINDOW_HOURS),
        }
    }

    pub fn record_analysis_at(
        &self,
        requester: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<u32>, UsageError> {
        let Some(key) = UsageKey::from_identifier(requester) else {
            return Ok(None);
        };
        let record = self.store.record_analysis(&key, at, at - self.window)?;
        debug!(
            requester = &key.as_str()[..12],
            analyses = record.analyses,
            "analysis counted"
        );
        Ok(Some(record.analyses))
    }

    pub fn register_email(
        &self,
        email: &str,
        user_id: Option<String>,
    ) -> Result<RegisteredUser, UsageError> {
        self.register_email_at(email, user_id, Utc::now())
    }

    pub fn register_email_at(
        &self,
        email: &str,
        user_id: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<RegisteredUser, UsageError> {
        let email = EmailAddress::parse(email)?;
        let user_id = user_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());
        let registration = Registration {
            email: email.clone(),
            registered_at: at,
            free_checks_limit: FREE_CHECKS_WITH_EMAIL,
            analyses_before: 0,
            user_id,
        };
        let record = self.store.register(&UsageKey::for_email(&email), registration)?;
        let registration = record.registration.as_ref().ok_or_else(|| {
            StoreError::Unavailable("registration was not persisted".to_string())
        })?;

        info!(email = %email.fingerprint(), "address registered for free checks");
        Ok(RegisteredUser::from_record(registration, &record))
    }

    pub fn email_status(&self, email: &str) -> Result<EmailStatus, UsageError> {
        let email = EmailAddress::parse(email)?;
        let record = self.store.fetch(&UsageKey::for_email(&email))?;
        let user = record.as_ref().and_then(|record| {
            record
                .registration
                .as_ref()
                .map(|registration| RegisteredUser::from_record(registration, record))
        });

        Ok(EmailStatus {
            registered: user.is_some(),
            user,
        })
    }

    pub fn check_limits(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
    ) -> Result<UsageLimits, UsageError> {
        self.check_limits_at(user_id, email, Utc::now())
    }

    /// A registered address takes precedence; otherwise `user_id` is held to the anonymous
    /// allowance over the rolling window.
    pub fn check_limits_at(
        &self,
        user_id: Option<&str>,
        email: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<UsageLimits, UsageError> {
        if let Some(email) = email.filter(|raw| !raw.trim().is_empty()) {
            let email = EmailAddress::parse(email)?;
            if let Some(record) = self.store.fetch(&UsageKey::for_email(&email))? {
                if let Some(registration) = &record.registration {
                    let used = record.free_checks_used();
                    let limit = registration.free_checks_limit;
                    return Ok(UsageLimits {
                        tier: UsageTier::Registered,
                        email: Some(email),
                        checks_used: used,
                        checks_limit: limit,
                        can_use_free: used < limit,
                        needs_email: false,
                        needs_upgrade: used >= limit,
                    });
                }
            }
        }

        let Some(key) = user_id.and_then(UsageKey::from_identifier) else {
            return Ok(UsageLimits::new_requester());
        };
        let used = match self.store.fetch(&key)? {
            Some(record) => record.analyses_since(now - self.window),
            None => 0,
        };

        Ok(UsageLimits {
            tier: UsageTier::Anonymous,
            email: None,
            checks_used: used,
            checks_limit: ANONYMOUS_FREE_CHECKS,
            can_use_free: used < ANONYMOUS_FREE_CHECKS,
            needs_email: used >= ANONYMOUS_FREE_CHECKS,
            needs_upgrade: false,
        })
    }
}

impl<U> AnalysisCounter for UsageService<U>
where
    U: UsageStore + 'static,
{
    fn count_analysis(&self, requester: &str) -> Result<Option<u32>, UsageError> {
        self.record_analysis_at(requester, Utc::now())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("usage store failed: {0}")]
    Store(#[from] StoreError),
}
