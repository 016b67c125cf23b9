//! Per-requester usage tracking: analysis counts, e-mail registration for extra free checks,
//! and the free-check allowance reported to the quote form.
//!
//! Records are keyed by a SHA-256 fingerprint of the requester identifier, so addresses are
//! never stored as keys.

pub mod memory;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use memory::InMemoryUsageStore;
pub use router::usage_router;
pub use service::{
    AnalysisCounter, EmailStatus, RegisteredUser, UsageError, UsageLimits, UsageService,
    UsageTier, ANONYMOUS_FREE_CHECKS, FREE_CHECKS_WITH_EMAIL,
};
pub use store::{Registration, UsageKey, UsageRecord, UsageStore};
