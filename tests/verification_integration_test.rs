//! End-to-end verification scenarios over the in-memory stores.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use common::*;
use terraverify::domain::{
    LocationKey, OfficialRecord, PrincipalId, VerificationId, VerificationRecord,
    VerificationStatus, MSG_COORDINATES_MISMATCH, MSG_INTERNAL_ERROR, MSG_LOCATION_MISMATCH,
    MSG_NOT_IN_REGISTRY, MSG_VERIFIED, REASON_LOCATION_MISMATCH,
};
use terraverify::engine::{EngineConfig, HistoryReader, VerificationEngine};
use terraverify::infra::{MemoryRegistry, MemoryVerificationStore, VerificationStore};
use terraverify::VerifierError;

fn alice() -> PrincipalId {
    PrincipalId::new("user-alice")
}

fn bob() -> PrincipalId {
    PrincipalId::new("user-bob")
}

// ============================================================================
// Verdicts
// ============================================================================

#[tokio::test]
async fn test_exact_match_is_verified_with_official_snapshot() {
    let (engine, _, store) = memory_engine([lekki_record()]);

    let record = engine
        .verify(&alice(), submission(lekki_key(), lekki_parcel()))
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Verified);
    assert!(record.is_verified);
    assert!(!record.is_fraud);
    assert_eq!(record.message.as_deref(), Some(MSG_VERIFIED));
    assert_eq!(record.location_match, Some(true));
    assert_eq!(record.coordinates_match, Some(true));
    assert!(record.distance_meters.unwrap() < 0.01);
    assert!((record.overlap_score.unwrap() - 1.0).abs() < 1e-9);
    assert_eq!(record.official_owner.as_deref(), Some("Adaeze Okafor"));
    assert_eq!(record.official_coords, Some(lekki_parcel()));
    assert_eq!(record.official_area, Some(1089.0));
    assert!(record.verified_at.is_some());

    let stored = store
        .get_for_principal(record.id, &alice())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored, record);
}

#[tokio::test]
async fn test_small_gps_drift_is_tolerated() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(lekki_key(), shift_north(&lekki_parcel(), 5.0)),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Verified);
    let distance = record.distance_meters.unwrap();
    assert!((4.9..5.1).contains(&distance), "distance was {distance}");
}

#[tokio::test]
async fn test_shifted_polygon_is_fraudulent() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(lekki_key(), shift_north(&lekki_parcel(), 200.0)),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Fraudulent);
    assert!(record.is_fraud);
    assert!(!record.is_verified);
    assert_eq!(record.message.as_deref(), Some(MSG_COORDINATES_MISMATCH));
    assert_eq!(record.location_match, Some(true));
    assert_eq!(record.coordinates_match, Some(false));

    let distance = record.distance_meters.unwrap();
    assert!((199.0..201.0).contains(&distance), "distance was {distance}");
    assert_eq!(
        record.fraud_reason.as_deref(),
        Some("Coordinates mismatch (distance: 200.0m)")
    );
    assert!(record.official_owner.is_none());
    assert!(record.official_coords.is_none());
}

#[tokio::test]
async fn test_unknown_parcel_fails() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(
                LocationKey::new("Ikeja", "GRA", "1", "1"),
                square_at(6.6000, 3.3500),
            ),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Failed);
    assert_eq!(record.message.as_deref(), Some(MSG_NOT_IN_REGISTRY));
    assert!(!record.is_fraud);
    assert!(!record.is_verified);
    assert!(record.location_match.is_none());
    assert!(record.distance_meters.is_none());
}

#[tokio::test]
async fn test_inactive_record_is_never_matched() {
    let (engine, _, _) = memory_engine([lekki_record().inactive()]);

    let record = engine
        .verify(&alice(), submission(lekki_key(), lekki_parcel()))
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Failed);
    assert_eq!(record.message.as_deref(), Some(MSG_NOT_IN_REGISTRY));
}

// ============================================================================
// Lookup phases
// ============================================================================

#[tokio::test]
async fn test_proximity_match_with_wrong_plot_is_location_fraud() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(
                LocationKey::new("Lekki", "Phase 1", "7", "3"),
                shift_north(&lekki_parcel(), 5.0),
            ),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Fraudulent);
    assert!(record.is_fraud);
    assert_eq!(record.location_match, Some(false));
    assert_eq!(record.fraud_reason.as_deref(), Some(REASON_LOCATION_MISMATCH));
    assert_eq!(record.message.as_deref(), Some(MSG_LOCATION_MISMATCH));
    assert!(record.coordinates_match.is_none());
}

#[tokio::test]
async fn test_proximity_radius_is_exclusive_of_distant_parcels() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(
                LocationKey::new("Lekki", "Phase 1", "7", "3"),
                shift_north(&lekki_parcel(), 60.0),
            ),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Failed);
    assert_eq!(record.message.as_deref(), Some(MSG_NOT_IN_REGISTRY));
}

#[tokio::test]
async fn test_exact_match_takes_precedence_over_nearer_parcel() {
    // Neighbour sits exactly where the submission is drawn, but the exact key
    // points at the official parcel 1 km away.
    let neighbour = OfficialRecord::new(
        "CERT-LEKKI-0901",
        LocationKey::new("Lekki", "Phase 1", "9", "1"),
        shift_north(&lekki_parcel(), 1_000.0),
        "Tunde Bakare",
    );
    let (engine, _, _) = memory_engine([lekki_record(), neighbour]);

    let record = engine
        .verify(
            &alice(),
            submission(lekki_key(), shift_north(&lekki_parcel(), 1_000.0)),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Fraudulent);
    assert_eq!(record.location_match, Some(true));
    assert_eq!(record.message.as_deref(), Some(MSG_COORDINATES_MISMATCH));
}

#[tokio::test]
async fn test_lookup_is_case_insensitive_on_town_and_layout() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(LocationKey::new("LEKKI", "phase 1", "5", "12"), lekki_parcel()),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Verified);
}

#[tokio::test]
async fn test_partial_layout_is_located_but_flagged() {
    let (engine, _, _) = memory_engine([lekki_record()]);

    let record = engine
        .verify(
            &alice(),
            submission(LocationKey::new("Lekki", "Phase", "5", "12"), lekki_parcel()),
        )
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Fraudulent);
    assert_eq!(record.fraud_reason.as_deref(), Some(REASON_LOCATION_MISMATCH));
}

#[tokio::test]
async fn test_malformed_submission_is_not_persisted() {
    let (engine, _, store) = memory_engine([lekki_record()]);

    let err = engine
        .verify(
            &alice(),
            submission(lekki_key(), lekki_parcel()[..2].to_vec()),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, VerifierError::Validation(_)));
    assert!(store.is_empty().await);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn test_history_is_scoped_and_newest_first() {
    let (engine, _, store) = memory_engine([lekki_record()]);
    let history = HistoryReader::new(store.clone());

    let first = engine
        .verify(&alice(), submission(lekki_key(), lekki_parcel()))
        .await
        .unwrap();
    let second = engine
        .verify(
            &alice(),
            submission(lekki_key(), shift_north(&lekki_parcel(), 200.0)),
        )
        .await
        .unwrap();
    let theirs = engine
        .verify(&bob(), submission(lekki_key(), lekki_parcel()))
        .await
        .unwrap();

    let items = history.list(&alice(), None).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].id, second.id);
    assert_eq!(items[1].id, first.id);
    assert_eq!(items[0].status, VerificationStatus::Fraudulent);
    assert_eq!(items[1].block, "5");
    assert_eq!(items[1].plot, "12");

    let limited = history.list(&alice(), Some(1)).await.unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, second.id);

    assert!(history.get(&alice(), theirs.id).await.unwrap().is_none());
    assert_eq!(
        history.get(&bob(), theirs.id).await.unwrap().map(|r| r.id),
        Some(theirs.id)
    );
}

#[tokio::test]
async fn test_every_attempt_is_recorded() {
    let (engine, _, store) = memory_engine([lekki_record()]);
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let meters = if i % 2 == 0 { 0.0 } else { 200.0 };
            engine
                .verify(
                    &PrincipalId::new(format!("user-{i}")),
                    submission(lekki_key(), shift_north(&lekki_parcel(), meters)),
                )
                .await
        }));
    }

    for handle in handles {
        let record = handle.await.unwrap().unwrap();
        assert!(record.status.is_terminal());
    }

    assert_eq!(store.len().await, 8);
}

// ============================================================================
// Storage faults
// ============================================================================

/// Memory store whose first `failing_updates` updates error out
struct FlakyUpdateStore {
    inner: MemoryVerificationStore,
    failing_updates: AtomicUsize,
}

#[async_trait]
impl VerificationStore for FlakyUpdateStore {
    async fn create(&self, record: &VerificationRecord) -> terraverify::Result<()> {
        self.inner.create(record).await
    }

    async fn update(&self, record: &VerificationRecord) -> terraverify::Result<()> {
        let remaining = self.failing_updates.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failing_updates.store(remaining - 1, Ordering::SeqCst);
            return Err(VerifierError::Internal("write timeout".into()));
        }
        self.inner.update(record).await
    }

    async fn list_for_principal(
        &self,
        principal_id: &PrincipalId,
        limit: usize,
    ) -> terraverify::Result<Vec<VerificationRecord>> {
        self.inner.list_for_principal(principal_id, limit).await
    }

    async fn get_for_principal(
        &self,
        id: VerificationId,
        principal_id: &PrincipalId,
    ) -> terraverify::Result<Option<VerificationRecord>> {
        self.inner.get_for_principal(id, principal_id).await
    }
}

#[tokio::test]
async fn test_lost_verdict_write_is_stored_as_failed() {
    let store = Arc::new(FlakyUpdateStore {
        inner: MemoryVerificationStore::new(),
        failing_updates: AtomicUsize::new(1),
    });
    let engine = VerificationEngine::new(
        Arc::new(MemoryRegistry::with_records([lekki_record()])),
        store.clone(),
        EngineConfig::default(),
    );

    let record = engine
        .verify(&alice(), submission(lekki_key(), lekki_parcel()))
        .await
        .unwrap();

    assert_eq!(record.status, VerificationStatus::Failed);
    assert_eq!(record.message.as_deref(), Some(MSG_INTERNAL_ERROR));
    assert!(!record.is_verified);

    let stored = store
        .get_for_principal(record.id, &alice())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, VerificationStatus::Failed);
    assert_eq!(stored.message.as_deref(), Some(MSG_INTERNAL_ERROR));
    assert!(stored.official_owner.is_none());

    let history = HistoryReader::new(store).list(&alice(), None).await.unwrap();
    assert!(history
        .iter()
        .all(|item| item.status != VerificationStatus::Pending));
}
