//! In-memory store implementations
//!
//! Used by tests and by the server when no `DATABASE_URL` is configured.
//! Nothing survives a restart.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{
    contains_ignore_case, InvalidTransition, LocationKey, OfficialRecord, PrincipalId,
    VerificationId, VerificationRecord,
};
use crate::infra::{RegistryStore, Result, VerificationStore, VerifierError};

/// In-memory official registry, iterated in insertion order
#[derive(Default)]
pub struct MemoryRegistry {
    records: RwLock<Vec<OfficialRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-loaded with `records`
    pub fn with_records(records: impl IntoIterator<Item = OfficialRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().collect()),
        }
    }

    /// Add a record to the registry
    pub async fn insert(&self, record: OfficialRecord) {
        self.records.write().await.push(record);
    }

    /// Number of records, active or not
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn find_exact(&self, key: &LocationKey) -> Result<Option<OfficialRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.is_active && r.location.lookup_matches(key))
            .cloned())
    }

    async fn list_active_in_town(&self, town: &str, limit: usize) -> Result<Vec<OfficialRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.is_active && contains_ignore_case(&r.location.town, town))
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory verification record store
#[derive(Default)]
pub struct MemoryVerificationStore {
    records: RwLock<Vec<VerificationRecord>>,
}

impl MemoryVerificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records across all principals
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn create(&self, record: &VerificationRecord) -> Result<()> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == record.id) {
            return Err(VerifierError::Internal(format!(
                "duplicate verification id: {}",
                record.id
            )));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn update(&self, record: &VerificationRecord) -> Result<()> {
        let mut records = self.records.write().await;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(VerifierError::VerificationNotFound(record.id))?;
        if !slot.is_pending() {
            return Err(InvalidTransition {
                from: slot.status,
                to: record.status,
            }
            .into());
        }
        *slot = record.clone();
        Ok(())
    }

    async fn list_for_principal(
        &self,
        principal_id: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>> {
        let records = self.records.read().await;
        // Later inserts first so equal timestamps still come out newest-first.
        let mut owned: Vec<VerificationRecord> = records
            .iter()
            .rev()
            .filter(|r| &r.principal_id == principal_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn get_for_principal(
        &self,
        id: VerificationId,
        principal_id: &PrincipalId,
    ) -> Result<Option<VerificationRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .find(|r| r.id == id && &r.principal_id == principal_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Coordinate, Submission, VerificationStatus};

    fn record(town: &str, block: &str, plot: &str) -> OfficialRecord {
        OfficialRecord::new(
            format!("CERT-{town}-{block}-{plot}"),
            LocationKey::new(town, "Phase1", block, plot),
            vec![
                Coordinate::new(6.43, 3.42),
                Coordinate::new(6.43, 3.4203),
                Coordinate::new(6.4303, 3.4203),
            ],
            "Owner",
        )
    }

    fn submission() -> Submission {
        Submission::new(
            LocationKey::new("Lekki", "Phase1", "5", "12"),
            vec![
                Coordinate::new(6.43, 3.42),
                Coordinate::new(6.43, 3.4203),
                Coordinate::new(6.4303, 3.4203),
            ],
        )
    }

    #[tokio::test]
    async fn test_find_exact_skips_inactive_records() {
        let registry = MemoryRegistry::with_records([
            record("Lekki", "5", "12").inactive(),
            record("Lekki", "5", "13"),
        ]);

        let found = registry
            .find_exact(&LocationKey::new("lekki", "phase1", "5", "12"))
            .await
            .unwrap();
        assert!(found.is_none());

        let found = registry
            .find_exact(&LocationKey::new("LEKKI", "phase", "5", "13"))
            .await
            .unwrap();
        assert_eq!(found.unwrap().location.plot_number, "13");
    }

    #[tokio::test]
    async fn test_list_active_in_town_is_bounded() {
        let registry = MemoryRegistry::new();
        for plot in 0..30 {
            registry.insert(record("Lekki", "5", &plot.to_string())).await;
        }
        registry.insert(record("Ikoyi", "1", "1")).await;

        let candidates = registry.list_active_in_town("lekki", 20).await.unwrap();
        assert_eq!(candidates.len(), 20);
        assert!(candidates.iter().all(|r| r.location.town == "Lekki"));
        assert_eq!(candidates[0].location.plot_number, "0");
    }

    #[tokio::test]
    async fn test_get_is_scoped_to_owner() {
        let store = MemoryVerificationStore::new();
        let owner = PrincipalId::new("alice");
        let rec = VerificationRecord::pending(owner.clone(), &submission());
        store.create(&rec).await.unwrap();

        assert!(store.get_for_principal(rec.id, &owner).await.unwrap().is_some());
        assert!(store
            .get_for_principal(rec.id, &PrincipalId::new("mallory"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_record() {
        let store = MemoryVerificationStore::new();
        let owner = PrincipalId::new("alice");
        let mut rec = VerificationRecord::pending(owner.clone(), &submission());
        store.create(&rec).await.unwrap();

        rec.mark_failed("Land not found in registry").unwrap();
        store.update(&rec).await.unwrap();

        let stored = store.get_for_principal(rec.id, &owner).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Failed);
    }

    #[tokio::test]
    async fn test_terminal_record_is_not_overwritten() {
        let store = MemoryVerificationStore::new();
        let owner = PrincipalId::new("alice");
        let pending = VerificationRecord::pending(owner.clone(), &submission());
        store.create(&pending).await.unwrap();

        let mut failed = pending.clone();
        failed.mark_failed("Land not found in registry").unwrap();
        store.update(&failed).await.unwrap();

        let mut later = pending;
        later.mark_location_mismatch().unwrap();
        assert!(matches!(
            store.update(&later).await,
            Err(VerifierError::InvalidStateTransition(t))
                if t.from == VerificationStatus::Failed && t.to == VerificationStatus::Fraudulent
        ));

        let stored = store.get_for_principal(failed.id, &owner).await.unwrap().unwrap();
        assert_eq!(stored.status, VerificationStatus::Failed);
        assert!(!stored.is_fraud);
    }

    #[tokio::test]
    async fn test_update_unknown_record_fails() {
        let store = MemoryVerificationStore::new();
        let rec = VerificationRecord::pending(PrincipalId::new("alice"), &submission());

        assert!(matches!(
            store.update(&rec).await,
            Err(VerifierError::VerificationNotFound(id)) if id == rec.id
        ));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_limited() {
        let store = MemoryVerificationStore::new();
        let alice = PrincipalId::new("alice");
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut rec = VerificationRecord::pending(alice.clone(), &submission());
            rec.requested_at += chrono::Duration::seconds(i);
            ids.push(rec.id);
            store.create(&rec).await.unwrap();
        }
        store
            .create(&VerificationRecord::pending(PrincipalId::new("bob"), &submission()))
            .await
            .unwrap();

        let listed = store.list_for_principal(&alice, 3).await.unwrap();
        let listed_ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(listed_ids, vec![ids[4], ids[3], ids[2]]);
    }
}
