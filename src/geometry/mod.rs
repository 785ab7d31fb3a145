//! Polygon geometry for parcel comparison
//!
//! Provides:
//! - Centroid, haversine distance and shoelace area
//! - Axis-aligned bounding-box overlap
//! - The 2-of-3 polygon comparison used to decide coordinate matches
//!
//! Everything here is pure and allocation-light. Areas are computed on raw
//! lat/lng treated as planar coordinates, so they are only meaningful as
//! ratios between nearby polygons.

mod compare;
mod measure;

pub use compare::*;
pub use measure::*;
