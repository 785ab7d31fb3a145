//! PostgreSQL land registry
//!
//! Reads the `land_registry` table. Imports go through [`PgRegistryStore::upsert`],
//! which only the admin tool calls.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPool, types::Json, FromRow};
use uuid::Uuid;

use crate::domain::{Coordinate, LocationKey, OfficialRecord};
use crate::infra::{RegistryStore, Result};

const REGISTRY_COLUMNS: &str = r#"
    id, certificate_number, certificate_pdf_url,
    town, layout, block_number, plot_number,
    coordinates, area_square_meters,
    owner_name, owner_national_id, owner_phone, owner_email,
    land_use, acquisition_date, registration_date, is_active, notes
"#;

/// PostgreSQL-backed registry
pub struct PgRegistryStore {
    pool: PgPool,
}

impl PgRegistryStore {
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

    /// Insert or replace a record keyed by certificate number
    pub async fn upsert(&self, record: &OfficialRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO land_registry (
                id, certificate_number, certificate_pdf_url,
                town, layout, block_number, plot_number,
                coordinates, area_square_meters,
                owner_name, owner_national_id, owner_phone, owner_email,
                land_use, acquisition_date, registration_date, is_active, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (certificate_number) DO UPDATE SET
                certificate_pdf_url = EXCLUDED.certificate_pdf_url,
                town = EXCLUDED.town,
                layout = EXCLUDED.layout,
                block_number = EXCLUDED.block_number,
                plot_number = EXCLUDED.plot_number,
                coordinates = EXCLUDED.coordinates,
                area_square_meters = EXCLUDED.area_square_meters,
                owner_name = EXCLUDED.owner_name,
                owner_national_id = EXCLUDED.owner_national_id,
                owner_phone = EXCLUDED.owner_phone,
                owner_email = EXCLUDED.owner_email,
                land_use = EXCLUDED.land_use,
                acquisition_date = EXCLUDED.acquisition_date,
                is_active = EXCLUDED.is_active,
                notes = EXCLUDED.notes
            "#,
        )
        .bind(record.id)
        .bind(&record.certificate_number)
        .bind(&record.certificate_pdf_url)
        .bind(&record.location.town)
        .bind(&record.location.layout)
        .bind(&record.location.block_number)
        .bind(&record.location.plot_number)
        .bind(Json(&record.coordinates))
        .bind(record.area_square_meters)
        .bind(&record.owner_name)
        .bind(&record.owner_national_id)
        .bind(&record.owner_phone)
        .bind(&record.owner_email)
        .bind(&record.land_use)
        .bind(record.acquisition_date)
        .bind(record.registration_date)
        .bind(record.is_active)
        .bind(&record.notes)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RegistryStore for PgRegistryStore {
    async fn find_exact(&self, key: &LocationKey) -> Result<Option<OfficialRecord>> {
        let query = format!(
            r#"
            SELECT {REGISTRY_COLUMNS}
            FROM land_registry
            WHERE town ILIKE $1
              AND layout ILIKE $2
              AND block_number = $3
              AND plot_number = $4
              AND is_active
            ORDER BY registration_date ASC, id ASC
            LIMIT 1
            "#
        );

        let row = sqlx::query_as::<_, RegistryRow>(&query)
            .bind(contains_pattern(&key.town))
            .bind(contains_pattern(&key.layout))
            .bind(&key.block_number)
            .bind(&key.plot_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(OfficialRecord::from))
    }

    async fn list_active_in_town(&self, town: &str, limit: usize) -> Result<Vec<OfficialRecord>> {
        let query = format!(
            r#"
            SELECT {REGISTRY_COLUMNS}
            FROM land_registry
            WHERE town ILIKE $1
              AND is_active
            ORDER BY registration_date ASC, id ASC
            LIMIT $2
            "#
        );

        let rows = sqlx::query_as::<_, RegistryRow>(&query)
            .bind(contains_pattern(town))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(OfficialRecord::from).collect())
    }
}

/// `%value%` with LIKE metacharacters escaped, so user input matches literally
pub(crate) fn contains_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Raw row from land_registry table
#[derive(Debug, FromRow)]
struct RegistryRow {
    id: Uuid,
    certificate_number: String,
    certificate_pdf_url: String,
    town: String,
    layout: String,
    block_number: String,
    plot_number: String,
    coordinates: Json<Vec<Coordinate>>,
    area_square_meters: Option<f64>,
    owner_name: String,
    owner_national_id: Option<String>,
    owner_phone: Option<String>,
    owner_email: Option<String>,
    land_use: Option<String>,
    acquisition_date: Option<DateTime<Utc>>,
    registration_date: DateTime<Utc>,
    is_active: bool,
    notes: Option<String>,
}

impl From<RegistryRow> for OfficialRecord {
    fn from(row: RegistryRow) -> Self {
        Self {
            id: row.id,
            certificate_number: row.certificate_number,
            certificate_pdf_url: row.certificate_pdf_url,
            location: LocationKey {
                town: row.town,
                layout: row.layout,
                block_number: row.block_number,
                plot_number: row.plot_number,
            },
            coordinates: row.coordinates.0,
            area_square_meters: row.area_square_meters,
            owner_name: row.owner_name,
            owner_national_id: row.owner_national_id,
            owner_phone: row.owner_phone,
            owner_email: row.owner_email,
            land_use: row.land_use,
            acquisition_date: row.acquisition_date,
            registration_date: row.registration_date,
            is_active: row.is_active,
            notes: row.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::contains_pattern;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Lekki"), "%Lekki%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
