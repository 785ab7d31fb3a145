//! Common test utilities and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use terraverify::domain::{Coordinate, LocationKey, OfficialRecord, Polygon, Submission};
use terraverify::engine::{EngineConfig, VerificationEngine};
use terraverify::infra::{MemoryRegistry, MemoryVerificationStore};

/// Meters per degree of latitude on the haversine sphere
pub const METERS_PER_DEGREE_LAT: f64 = 111_195.0;

/// Side length of the fixture parcel in degrees (about 33 m)
pub const PARCEL_SIDE_DEG: f64 = 0.0003;

/// Square parcel anchored at (`lat`, `lng`)
pub fn square_at(lat: f64, lng: f64) -> Polygon {
    vec![
        Coordinate::new(lat, lng),
        Coordinate::new(lat, lng + PARCEL_SIDE_DEG),
        Coordinate::new(lat + PARCEL_SIDE_DEG, lng + PARCEL_SIDE_DEG),
        Coordinate::new(lat + PARCEL_SIDE_DEG, lng),
    ]
}

/// The fixture parcel in Lekki
pub fn lekki_parcel() -> Polygon {
    square_at(6.4300, 3.4200)
}

/// Translate a polygon `meters` due north
pub fn shift_north(polygon: &[Coordinate], meters: f64) -> Polygon {
    let dlat = meters / METERS_PER_DEGREE_LAT;
    polygon
        .iter()
        .map(|c| Coordinate::new(c.lat + dlat, c.lng))
        .collect()
}

pub fn lekki_key() -> LocationKey {
    LocationKey::new("Lekki", "Phase 1", "5", "12")
}

/// Official record for block 5, plot 12 in Lekki Phase 1
pub fn lekki_record() -> OfficialRecord {
    OfficialRecord::new("CERT-LEKKI-0512", lekki_key(), lekki_parcel(), "Adaeze Okafor")
        .with_area(1089.0)
}

pub fn submission(location: LocationKey, coordinates: Polygon) -> Submission {
    Submission::new(location, coordinates)
}

/// Engine over in-memory stores, returning the stores for inspection
pub fn memory_engine(
    records: impl IntoIterator<Item = OfficialRecord>,
) -> (
    VerificationEngine,
    Arc<MemoryRegistry>,
    Arc<MemoryVerificationStore>,
) {
    let registry = Arc::new(MemoryRegistry::with_records(records));
    let store = Arc::new(MemoryVerificationStore::new());
    let engine = VerificationEngine::new(registry.clone(), store.clone(), EngineConfig::default());
    (engine, registry, store)
}
