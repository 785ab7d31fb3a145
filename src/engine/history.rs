//! Owner-scoped reads over past verifications

use std::sync::Arc;

use crate::domain::{PrincipalId, VerificationId, VerificationRecord, VerificationSummary};
use crate::infra::{Result, VerificationStore};

/// Page size when the caller gives none
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Largest page size served unless configured otherwise
pub const MAX_HISTORY_LIMIT: usize = 100;

pub struct HistoryReader {
    store: Arc<dyn VerificationStore>,
    max_limit: usize,
}

impl HistoryReader {
    pub fn new(store: Arc<dyn VerificationStore>) -> Self {
        Self {
            store,
            max_limit: MAX_HISTORY_LIMIT,
        }
    }

    pub fn with_max_limit(mut self, max_limit: usize) -> Self {
        self.max_limit = max_limit.max(1);
        self
    }

    /// Effective page size for a requested `limit`
    pub fn clamp_limit(&self, limit: Option<usize>) -> usize {
        limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, self.max_limit)
    }

    /// Newest-first summaries of `principal_id`'s verifications
    pub async fn list(
        &self,
        principal_id: &PrincipalId,
        limit: Option<usize>,
    ) -> Result<Vec<VerificationSummary>> {
        let records = self
            .store
            .list_for_principal(principal_id, self.clamp_limit(limit))
            .await?;
        Ok(records.iter().map(VerificationSummary::from).collect())
    }

    /// A single verification; `None` when missing or owned by someone else
    pub async fn get(
        &self,
        principal_id: &PrincipalId,
        id: VerificationId,
    ) -> Result<Option<VerificationRecord>> {
        self.store.get_for_principal(id, principal_id).await
    }
}
