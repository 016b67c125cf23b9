use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::workflows::delivery::{EmailAddress, StoreError};

/// Hex SHA-256 of a trimmed, lower-cased requester identifier. For a valid address this is
/// the same value as [`EmailAddress::hash`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageKey(String);

impl UsageKey {
    /// `None` for blank identifiers.
    pub fn from_identifier(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        Some(Self(hex::encode(Sha256::digest(normalized.as_bytes()))))
    }

    pub fn for_email(email: &EmailAddress) -> Self {
        Self(email.hash())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// E-mail registration granting the larger free-check allowance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    pub email: EmailAddress,
    pub registered_at: DateTime<Utc>,
    pub free_checks_limit: u32,
    /// Analyses already counted when the address registered; they do not use up free checks.
    pub analyses_before: u32,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub key: UsageKey,
    pub analyses: u32,
    /// Analysis times inside the rolling window, oldest first.
    pub recent: Vec<DateTime<Utc>>,
    pub registration: Option<Registration>,
}

impl UsageRecord {
    pub fn new(key: UsageKey) -> Self {
        Self {
            key,
            analyses: 0,
            recent: Vec::new(),
            registration: None,
        }
    }

    pub fn analyses_since(&self, start: DateTime<Utc>) -> u32 {
        let count = self.recent.iter().filter(|at| **at >= start).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn free_checks_used(&self) -> u32 {
        match &self.registration {
            Some(registration) => self.analyses.saturating_sub(registration.analyses_before),
            None => self.analyses,
        }
    }
}

/// Usage counters per requester key. `record_analysis` and `register` must each be one
/// atomic step so concurrent analyses never lose a count.
pub trait UsageStore: Send + Sync {
    /// Count one analysis at `at` and drop window entries older than `window_start`.
    fn record_analysis(
        &self,
        key: &UsageKey,
        at: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError>;
    /// Attach `registration` unless one exists; an existing registration keeps its counts and
    /// only takes a newly supplied `user_id`.
    fn register(
        &self,
        key: &UsageKey,
        registration: Registration,
    ) -> Result<UsageRecord, StoreError>;
    fn fetch(&self, key: &UsageKey) -> Result<Option<UsageRecord>, StoreError>;
}
