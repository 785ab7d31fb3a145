//! PostgreSQL verification record store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, types::Json, FromRow};
use uuid::Uuid;

use crate::domain::{
    Coordinate, InvalidTransition, LocationKey, PrincipalId, VerificationId, VerificationRecord,
    VerificationStatus,
};
use crate::infra::{Result, VerificationStore, VerifierError};

const VERIFICATION_COLUMNS: &str = r#"
    id, user_id,
    submitted_town, submitted_layout, submitted_block, submitted_plot, submitted_coords,
    status, is_verified, message,
    location_match, coordinates_match, overlap_score, distance_meters,
    is_fraud, fraud_reason,
    official_owner, official_coords, official_area,
    requested_at, verified_at
"#;

/// PostgreSQL-backed verification store
pub struct PgVerificationStore {
    pool: PgPool,
}

impl PgVerificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create from connection string
    pub async fn from_url(url: &str) -> Result<Self> {
        let pool = PgPool::connect(url).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl VerificationStore for PgVerificationStore {
    async fn create(&self, record: &VerificationRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO verification_requests (
                id, user_id,
                submitted_town, submitted_layout, submitted_block, submitted_plot, submitted_coords,
                status, is_verified, message,
                location_match, coordinates_match, overlap_score, distance_meters,
                is_fraud, fraud_reason,
                official_owner, official_coords, official_area,
                requested_at, verified_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20, $21
            )
            "#,
        )
        .bind(record.id.0)
        .bind(record.principal_id.as_str())
        .bind(&record.submitted.town)
        .bind(&record.submitted.layout)
        .bind(&record.submitted.block_number)
        .bind(&record.submitted.plot_number)
        .bind(Json(&record.submitted_coords))
        .bind(record.status.as_str())
        .bind(record.is_verified)
        .bind(&record.message)
        .bind(record.location_match)
        .bind(record.coordinates_match)
        .bind(record.overlap_score)
        .bind(record.distance_meters)
        .bind(record.is_fraud)
        .bind(&record.fraud_reason)
        .bind(&record.official_owner)
        .bind(record.official_coords.as_ref().map(Json))
        .bind(record.official_area)
        .bind(record.requested_at)
        .bind(record.verified_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, record: &VerificationRecord) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE verification_requests SET
                status = $2,
                is_verified = $3,
                message = $4,
                location_match = $5,
                coordinates_match = $6,
                overlap_score = $7,
                distance_meters = $8,
                is_fraud = $9,
                fraud_reason = $10,
                official_owner = $11,
                official_coords = $12,
                official_area = $13,
                verified_at = $14
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(record.id.0)
        .bind(record.status.as_str())
        .bind(record.is_verified)
        .bind(&record.message)
        .bind(record.location_match)
        .bind(record.coordinates_match)
        .bind(record.overlap_score)
        .bind(record.distance_meters)
        .bind(record.is_fraud)
        .bind(&record.fraud_reason)
        .bind(&record.official_owner)
        .bind(record.official_coords.as_ref().map(Json))
        .bind(record.official_area)
        .bind(record.verified_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing updated: either the row is missing or it is already terminal
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM verification_requests WHERE id = $1")
                .bind(record.id.0)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            None => Err(VerifierError::VerificationNotFound(record.id)),
            Some((status,)) => {
                let from: VerificationStatus = status.parse().map_err(VerifierError::Internal)?;
                Err(InvalidTransition {
                    from,
                    to: record.status,
                }
                .into())
            }
        }
    }

    async fn list_for_principal(
        &self,
        principal_id: &PrincipalId,
        limit: usize,
    ) -> Result<Vec<VerificationRecord>> {
        let query = format!(
            r#"
            SELECT {VERIFICATION_COLUMNS}
            FROM verification_requests
            WHERE user_id = $1
            ORDER BY requested_at DESC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, VerificationRow>(&query)
            .bind(principal_id.as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(VerificationRecord::try_from).collect()
    }

    async fn get_for_principal(
        &self,
        id: VerificationId,
        principal_id: &PrincipalId,
    ) -> Result<Option<VerificationRecord>> {
        let query = format!(
            r#"
            SELECT {VERIFICATION_COLUMNS}
            FROM verification_requests
            WHERE id = $1 AND user_id = $2
            "#
        );

        let row = sqlx::query_as::<_, VerificationRow>(&query)
            .bind(id.0)
            .bind(principal_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(VerificationRecord::try_from).transpose()
    }
}

/// Raw row from verification_requests table
#[derive(Debug, FromRow)]
struct VerificationRow {
    id: Uuid,
    user_id: String,
    submitted_town: String,
    submitted_layout: String,
    submitted_block: String,
    submitted_plot: String,
    submitted_coords: Json<Vec<Coordinate>>,
    status: String,
    is_verified: bool,
    message: Option<String>,
    location_match: Option<bool>,
    coordinates_match: Option<bool>,
    overlap_score: Option<f64>,
    distance_meters: Option<f64>,
    is_fraud: bool,
    fraud_reason: Option<String>,
    official_owner: Option<String>,
    official_coords: Option<Json<Vec<Coordinate>>>,
    official_area: Option<f64>,
    requested_at: DateTime<Utc>,
    verified_at: Option<DateTime<Utc>>,
}

impl TryFrom<VerificationRow> for VerificationRecord {
    type Error = VerifierError;

    fn try_from(row: VerificationRow) -> Result<Self> {
        let status: VerificationStatus = row.status.parse().map_err(VerifierError::Internal)?;

        Ok(Self {
            id: VerificationId::from_uuid(row.id),
            principal_id: PrincipalId(row.user_id),
            submitted: LocationKey {
                town: row.submitted_town,
                layout: row.submitted_layout,
                block_number: row.submitted_block,
                plot_number: row.submitted_plot,
            },
            submitted_coords: row.submitted_coords.0,
            status,
            is_verified: row.is_verified,
            message: row.message,
            location_match: row.location_match,
            coordinates_match: row.coordinates_match,
            overlap_score: row.overlap_score,
            distance_meters: row.distance_meters,
            is_fraud: row.is_fraud,
            fraud_reason: row.fraud_reason,
            official_owner: row.official_owner,
            official_coords: row.official_coords.map(|c| c.0),
            official_area: row.official_area,
            requested_at: row.requested_at,
            verified_at: row.verified_at,
        })
    }
}
