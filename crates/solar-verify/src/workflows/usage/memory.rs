use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::store::{Registration, UsageKey, UsageRecord, UsageStore};
use crate::workflows::delivery::StoreError;

/// Process-local usage counters.
#[derive(Default)]
pub struct InMemoryUsageStore {
    records: Mutex<HashMap<UsageKey, UsageRecord>>,
}

impl UsageStore for InMemoryUsageStore {
    fn record_analysis(
        &self,
        key: &UsageKey,
        at: DateTime<Utc>,
        window_start: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError> {
        let mut guard = self.records.lock().expect("usage store mutex poisoned");
        let record = guard
            .entry(key.clone())
            .or_insert_with(|| UsageRecord::new(key.clone()));
        record.analyses = record.analyses.saturating_add(1);
        record.recent.retain(|seen| *seen >= window_start);
        record.recent.push(at);
        Ok(record.clone())
    }

    fn register(
        &self,
        key: &UsageKey,
        registration: Registration,
    ) -> Result<UsageRecord, StoreError> {
        let mut guard = self.records.lock().expect("usage store mutex poisoned");
        let record = guard
            .entry(key.clone())
            .or_insert_with(|| UsageRecord::new(key.clone()));
        match record.registration.as_mut() {
            Some(existing) => {
                if registration.user_id.is_some() {
                    existing.user_id = registration.user_id;
                }
            }
            None => {
                record.registration = Some(Registration {
                    analyses_before: record.analyses,
                    ..registration
                });
            }
        }
        Ok(record.clone())
    }

    fn fetch(&self, key: &UsageKey) -> Result<Option<UsageRecord>, StoreError> {
        let guard = self.records.lock().expect("usage store mutex poisoned");
        Ok(guard.get(key).cloned())
    }
}
