//! Verification engine
//!
//! Runs a single verification from the pending insert to a terminal verdict:
//!
//! 1. Persist a `pending` record holding a copy of the submission
//! 2. Locate the official record (exact key, then proximity)
//! 3. Re-check the declared identity strictly against the located record
//! 4. Compare the polygons with the 2-of-3 policy
//! 5. Persist the verdict
//!
//! Once step 1 has committed, faults are logged and turned into a `failed`
//! record. That includes a failed write of the verdict in step 5: the verdict
//! is discarded and a `failed` record is written in its place. The caller
//! never sees these faults as errors.

use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::domain::{
    PrincipalId, Submission, VerificationRecord, VerificationStatus, MSG_INTERNAL_ERROR,
    MSG_NOT_IN_REGISTRY,
};
use crate::geometry::GeometryComparator;
use crate::infra::{RegistryStore, Result, VerificationStore};
use crate::metrics::{metric_names, MetricsRegistry};

use super::{EngineConfig, MatchPhase, RegistryLocator};

/// Orchestrates registry lookup, geometry comparison and the verdict
pub struct VerificationEngine {
    locator: RegistryLocator,
    store: Arc<dyn VerificationStore>,
    comparator: GeometryComparator,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl VerificationEngine {
    pub fn new(
        registry: Arc<dyn RegistryStore>,
        store: Arc<dyn VerificationStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            locator: RegistryLocator::new(registry, &config),
            store,
            comparator: GeometryComparator::with_thresholds(config.comparison_thresholds()),
            metrics: None,
        }
    }

    /// Report outcomes and latency to `metrics`
    pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Verify `submission` on behalf of `principal_id`.
    ///
    /// Returns `Err` only if the submission is malformed or the pending
    /// record could not be created. Otherwise the returned record is terminal.
    #[instrument(skip(self, submission), fields(principal_id = %principal_id))]
    pub async fn verify(
        &self,
        principal_id: &PrincipalId,
        submission: Submission,
    ) -> Result<VerificationRecord> {
        submission.validate()?;
        let started = Instant::now();

        let mut record = VerificationRecord::pending(principal_id.clone(), &submission);
        self.store.create(&record).await?;
        let pending = record.clone();

        info!(
            verification_id = %record.id,
            location = %submission.location,
            "Verification started"
        );

        if let Err(err) = self.decide(&mut record, &submission).await {
            error!(verification_id = %record.id, error = %err, "Verification aborted");
            self.count(metric_names::INTERNAL_ERRORS).await;
            // Transitions are the last step of `decide`, so a fault leaves the record pending
            if let Err(transition) = record.mark_failed(MSG_INTERNAL_ERROR) {
                error!(verification_id = %record.id, error = %transition, "Could not fail verification");
            }
        }

        if let Err(err) = self.store.update(&record).await {
            error!(
                verification_id = %record.id,
                status = %record.status,
                error = %err,
                "Failed to persist verification outcome"
            );
            self.count(metric_names::INTERNAL_ERRORS).await;
            record = self.persist_internal_failure(pending).await;
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.observe_outcome(record.status, elapsed_ms).await;

        info!(
            verification_id = %record.id,
            status = %record.status,
            is_fraud = record.is_fraud,
            elapsed_ms,
            "Verification finished"
        );

        Ok(record)
    }

    async fn decide(
        &self,
        record: &mut VerificationRecord,
        submission: &Submission,
    ) -> Result<()> {
        let Some(located) = self.locator.find(submission).await? else {
            info!(verification_id = %record.id, "No registry record for submission");
            self.count(metric_names::REGISTRY_MISSES).await;
            record.mark_failed(MSG_NOT_IN_REGISTRY)?;
            return Ok(());
        };

        self.count(match located.phase {
            MatchPhase::Exact => metric_names::REGISTRY_EXACT_MATCHES,
            MatchPhase::Proximity => metric_names::REGISTRY_PROXIMITY_MATCHES,
        })
        .await;

        let official = &located.record;

        // The exact phase matches town/layout loosely and the proximity phase
        // ignores the key entirely; identity must still hold strictly.
        if !submission.location.identity_matches(&official.location) {
            warn!(
                verification_id = %record.id,
                registry_id = %official.id,
                declared = %submission.location,
                registered = %official.location,
                phase = ?located.phase,
                "Declared location does not match registry record"
            );
            record.mark_location_mismatch()?;
            return Ok(());
        }

        let comparison = self
            .comparator
            .compare(&submission.coordinates, &official.coordinates);

        record.record_measurements(
            comparison.is_match,
            comparison.area_ratio,
            comparison.distance_meters,
        )?;

        if comparison.is_match {
            info!(
                verification_id = %record.id,
                registry_id = %official.id,
                distance_m = comparison.distance_meters,
                pass_count = comparison.pass_count,
                "Coordinates match registry record"
            );
            record.mark_verified(official)?;
        } else {
            warn!(
                verification_id = %record.id,
                registry_id = %official.id,
                distance_m = comparison.distance_meters,
                area_ratio = comparison.area_ratio,
                bbox_overlap = comparison.bbox_overlap,
                "Coordinates do not match registry record"
            );
            record.mark_coordinates_mismatch(comparison.distance_meters)?;
        }

        Ok(())
    }

    /// Fail the still-pending snapshot and try once more to store it.
    ///
    /// The stored row stays `pending` only if this second write fails too.
    async fn persist_internal_failure(
        &self,
        mut record: VerificationRecord,
    ) -> VerificationRecord {
        if let Err(transition) = record.mark_failed(MSG_INTERNAL_ERROR) {
            error!(verification_id = %record.id, error = %transition, "Could not fail verification");
            return record;
        }

        if let Err(err) = self.store.update(&record).await {
            error!(
                verification_id = %record.id,
                error = %err,
                "Failed to persist internal failure; record left pending"
            );
        }
        record
    }

    async fn count(&self, name: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_counter(name).await;
        }
    }

    async fn observe_outcome(&self, status: VerificationStatus, elapsed_ms: f64) {
        let Some(metrics) = &self.metrics else {
            return;
        };

        metrics.inc_counter(metric_names::VERIFICATIONS_TOTAL).await;
        let outcome = match status {
            VerificationStatus::Verified => metric_names::VERIFICATIONS_VERIFIED,
            VerificationStatus::Fraudulent => metric_names::VERIFICATIONS_FRAUDULENT,
            VerificationStatus::Failed | VerificationStatus::Pending => {
                metric_names::VERIFICATIONS_FAILED
            }
        };
        metrics.inc_counter(outcome).await;
        metrics
            .observe_histogram(metric_names::VERIFICATION_DURATION, elapsed_ms)
            .await;
    }
}
