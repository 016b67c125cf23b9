use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::address::EmailAddress;
use super::token::{AnalysisSnapshot, TokenId};

/// Analysis held between link issuance and verification, keyed by token id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAnalysis {
    pub token_id: TokenId,
    pub email: EmailAddress,
    pub snapshot: AnalysisSnapshot,
    pub issued_at: DateTime<Utc>,
    /// Encoded token, kept so a sweep can re-run verification.
    pub token: String,
}

/// Key-value view of the result store.
pub trait AnalysisStore: Send + Sync {
    fn put(&self, record: StoredAnalysis) -> Result<(), StoreError>;
    fn fetch(&self, id: &TokenId) -> Result<Option<StoredAnalysis>, StoreError>;
    fn remove(&self, id: &TokenId) -> Result<Option<StoredAnalysis>, StoreError>;
    fn entries(&self) -> Result<Vec<StoredAnalysis>, StoreError>;
}

/// Report delivery progress for one token. Absent markers read as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    Pending,
    InFlight,
    Fired,
}

/// Per-token delivery marker. Implementations must perform `compare_and_set` as one atomic
/// step; a read followed by a write lets two verifications both send the report.
pub trait DeliveryGate: Send + Sync {
    fn state(&self, id: &TokenId) -> Result<DeliveryState, StoreError>;
    /// Move `id` from `expected` to `next`. Returns `false` without writing when the current
    /// state is not `expected`.
    fn compare_and_set(
        &self,
        id: &TokenId,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> Result<bool, StoreError>;
    fn forget(&self, id: &TokenId) -> Result<(), StoreError>;
}

/// Numeric verification code record, keyed by email hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRecord {
    pub email_hash: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub verified: bool,
}

pub trait CodeStore: Send + Sync {
    /// Insert or replace the record for `record.email_hash`.
    fn upsert(&self, record: CodeRecord) -> Result<(), StoreError>;
    /// Atomically increment the attempt counter, returning the updated record.
    fn register_attempt(&self, email_hash: &str) -> Result<Option<CodeRecord>, StoreError>;
    fn mark_verified(&self, email_hash: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
