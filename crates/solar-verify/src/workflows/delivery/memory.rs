use std::collections::HashMap;
use std::sync::Mutex;

use super::store::{
    AnalysisStore, CodeRecord, CodeStore, DeliveryGate, DeliveryState, StoreError, StoredAnalysis,
};
use super::token::TokenId;

/// Process-local result store.
#[derive(Default)]
pub struct InMemoryAnalysisStore {
    records: Mutex<HashMap<TokenId, StoredAnalysis>>,
}

impl AnalysisStore for InMemoryAnalysisStore {
    fn put(&self, record: StoredAnalysis) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("analysis store mutex poisoned");
        guard.insert(record.token_id, record);
        Ok(())
    }

    fn fetch(&self, id: &TokenId) -> Result<Option<StoredAnalysis>, StoreError> {
        let guard = self.records.lock().expect("analysis store mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn remove(&self, id: &TokenId) -> Result<Option<StoredAnalysis>, StoreError> {
        let mut guard = self.records.lock().expect("analysis store mutex poisoned");
        Ok(guard.remove(id))
    }

    fn entries(&self) -> Result<Vec<StoredAnalysis>, StoreError> {
        let guard = self.records.lock().expect("analysis store mutex poisoned");
        Ok(guard.values().cloned().collect())
    }
}

/// Delivery markers guarded by a single mutex; compare and write happen under one lock.
#[derive(Default)]
pub struct InMemoryDeliveryGate {
    states: Mutex<HashMap<TokenId, DeliveryState>>,
}

impl DeliveryGate for InMemoryDeliveryGate {
    fn state(&self, id: &TokenId) -> Result<DeliveryState, StoreError> {
        let guard = self.states.lock().expect("delivery gate mutex poisoned");
        Ok(guard.get(id).copied().unwrap_or(DeliveryState::Pending))
    }

    fn compare_and_set(
        &self,
        id: &TokenId,
        expected: DeliveryState,
        next: DeliveryState,
    ) -> Result<bool, StoreError> {
        let mut guard = self.states.lock().expect("delivery gate mutex poisoned");
        let current = guard.get(id).copied().unwrap_or(DeliveryState::Pending);
        if current != expected {
            return Ok(false);
        }

        match next {
            DeliveryState::Pending => guard.remove(id),
            other => guard.insert(*id, other),
        };
        Ok(true)
    }

    fn forget(&self, id: &TokenId) -> Result<(), StoreError> {
        let mut guard = self.states.lock().expect("delivery gate mutex poisoned");
        guard.remove(id);
        Ok(())
    }
}

/// Verification codes keyed by email hash.
#[derive(Default)]
pub struct InMemoryCodeStore {
    records: Mutex<HashMap<String, CodeRecord>>,
}

impl CodeStore for InMemoryCodeStore {
    fn upsert(&self, record: CodeRecord) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("code store mutex poisoned");
        guard.insert(record.email_hash.clone(), record);
        Ok(())
    }

    fn register_attempt(&self, email_hash: &str) -> Result<Option<CodeRecord>, StoreError> {
        let mut guard = self.records.lock().expect("code store mutex poisoned");
        Ok(guard.get_mut(email_hash).map(|record| {
            record.attempts = record.attempts.saturating_add(1);
            record.clone()
        }))
    }

    fn mark_verified(&self, email_hash: &str) -> Result<(), StoreError> {
        let mut guard = self.records.lock().expect("code store mutex poisoned");
        if let Some(record) = guard.get_mut(email_hash) {
            record.verified = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_only_advances_from_expected_state() {
        let gate = InMemoryDeliveryGate::default();
        let id = TokenId::random();

        assert_eq!(gate.state(&id).unwrap(), DeliveryState::Pending);
        assert!(gate
            .compare_and_set(&id, DeliveryState::Pending, DeliveryState::InFlight)
            .unwrap());
        assert!(!gate
            .compare_and_set(&id, DeliveryState::Pending, DeliveryState::InFlight)
            .unwrap());
        assert!(gate
            .compare_and_set(&id, DeliveryState::InFlight, DeliveryState::Fired)
            .unwrap());
        assert_eq!(gate.state(&id).unwrap(), DeliveryState::Fired);

        gate.forget(&id).unwrap();
        assert_eq!(gate.state(&id).unwrap(), DeliveryState::Pending);
    }

    #[test]
    fn resetting_to_pending_clears_the_marker() {
        let gate = InMemoryDeliveryGate::default();
        let id = TokenId::random();
        gate.compare_and_set(&id, DeliveryState::Pending, DeliveryState::InFlight)
            .unwrap();
        assert!(gate
            .compare_and_set(&id, DeliveryState::InFlight, DeliveryState::Pending)
            .unwrap());
        assert!(gate.states.lock().unwrap().is_empty());
    }

    #[test]
    fn code_attempts_increment_per_call() {
        let store = InMemoryCodeStore::default();
        assert_eq!(store.register_attempt("abc").unwrap(), None);

        store
            .upsert(CodeRecord {
                email_hash: "abc".to_string(),
                code: "123456".to_string(),
                created_at: chrono::Utc::now(),
                attempts: 0,
                verified: false,
            })
            .unwrap();

        assert_eq!(store.register_attempt("abc").unwrap().map(|r| r.attempts), Some(1));
        assert_eq!(store.register_attempt("abc").unwrap().map(|r| r.attempts), Some(2));
        store.mark_verified("abc").unwrap();
        assert_eq!(store.register_attempt("abc").unwrap().map(|r| r.verified), Some(true));
    }
}
