//! Point and polygon measurements

use crate::domain::Coordinate;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Arithmetic mean of the vertices. An empty polygon yields `(0, 0)`.
pub fn centroid(polygon: &[Coordinate]) -> Coordinate {
    if polygon.is_empty() {
        return Coordinate::new(0.0, 0.0);
    }

    let n = polygon.len() as f64;
    let (lat_sum, lng_sum) = polygon
        .iter()
        .fold((0.0, 0.0), |(lat, lng), c| (lat + c.lat, lng + c.lng));

    Coordinate::new(lat_sum / n, lng_sum / n)
}

/// Great-circle distance between two points in meters
pub fn haversine_distance(p1: Coordinate, p2: Coordinate) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlng = (p2.lng - p1.lng).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    // Rounding can push `a` fractionally above 1 for antipodal points.
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    EARTH_RADIUS_METERS * c
}

/// Shoelace area on raw lat/lng, absolute value. Fewer than 3 vertices yields 0.
pub fn polygon_area(polygon: &[Coordinate]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let n = polygon.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let p = polygon[i];
            let q = polygon[(i + 1) % n];
            p.lat * q.lng - q.lat * p.lng
        })
        .sum();

    twice_area.abs() / 2.0
}

/// Axis-aligned bounds of a polygon in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub min_lng: f64,
    pub max_lat: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Bounds of the polygon, or `None` when it has no vertices
    pub fn of(polygon: &[Coordinate]) -> Option<Self> {
        let first = polygon.first()?;
        let init = Self {
            min_lat: first.lat,
            min_lng: first.lng,
            max_lat: first.lat,
            max_lng: first.lng,
        };

        Some(polygon.iter().skip(1).fold(init, |b, c| Self {
            min_lat: b.min_lat.min(c.lat),
            min_lng: b.min_lng.min(c.lng),
            max_lat: b.max_lat.max(c.lat),
            max_lng: b.max_lng.max(c.lng),
        }))
    }

    /// Boxes intersect unless strictly disjoint on either axis. Touching counts.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_lat < other.min_lat
            || other.max_lat < self.min_lat
            || self.max_lng < other.min_lng
            || other.max_lng < self.min_lng)
    }
}

/// Whether the bounding boxes of two polygons intersect
pub fn bounding_box_overlap(poly1: &[Coordinate], poly2: &[Coordinate]) -> bool {
    match (BoundingBox::of(poly1), BoundingBox::of(poly2)) {
        (Some(a), Some(b)) => a.intersects(&b),
        _ => false,
    }
}

/// `min/max` of two areas, or 0 when either is 0
pub fn area_ratio(area1: f64, area2: f64) -> f64 {
    if area1 <= 0.0 || area2 <= 0.0 {
        return 0.0;
    }
    area1.min(area2) / area1.max(area2)
}
