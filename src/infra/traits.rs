//! Trait definitions for the verification service's collaborators

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::domain::{
    LocationKey, OfficialRecord, PrincipalId, VerificationId, VerificationRecord,
};

use super::Result;

/// Read-only access to the official land registry.
///
/// Only active records are ever returned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Exact-key lookup.
    ///
    /// Town and layout match by case-insensitive containment of the query's
    /// value in the stored value; block and plot must be equal.
    async fn find_exact(&self, key: &LocationKey) -> Result<Option<OfficialRecord>>;

    /// Active records whose town contains `town` (case-insensitive), at most `limit`
    async fn list_active_in_town(&self, town: &str, limit: usize) -> Result<Vec<OfficialRecord>>;
}

/// Persistence for verification records.
///
/// Writes to one record must be visible to later reads of that record; no
/// cross-record isolation is required.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Insert a new record
    async fn create(&self, record: &VerificationRecord) -> Result<()>;

    /// Overwrite an existing record by id.
    ///
    /// Only a stored record that is still `pending` may be overwritten;
    /// terminal records are rejected with `InvalidStateTransition`.
    async fn update(&self, record: &VerificationRecord) -> Result<()>;

    /// Records owned by `principal_id`, newest `requested_at` first
    async fn list_for_principal(
        &self,
        principal_id: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>>;

    /// A single record, only if owned by `principal_id`
    async fn get_for_principal(
        &self,
        id: VerificationId,
        principal_id: &PrincipalId,
    ) -> Result<Option<VerificationRecord>>;
}
