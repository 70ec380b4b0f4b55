#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! In-memory spatial indexes for tree matching.
//!
//! - [`BoundaryIndex`] holds borough polygons in an R-tree keyed by their
//!   bounding boxes and answers point-in-polygon lookups.
//! - [`CensusIndex`] holds the census street trees that fall within a
//!   tile's buffered bounds and answers nearest-neighbor queries.
//!
//! Both are built once and read-only afterwards, so a single instance can
//! be shared across tiles without locking.

pub mod boundary;
pub mod census;

pub use boundary::{BoroughPolygon, BoundaryIndex};
pub use census::{BoundingBox, BoundsBuffer, CensusIndex};

use geo::MultiPolygon;
use rstar::AABB;

/// Converts a `GeoJSON` geometry into a [`MultiPolygon`].
/// Handles both `Polygon` and `MultiPolygon` geometry types.
#[must_use]
pub fn geometry_to_multipolygon(geometry: geojson::Geometry) -> Option<MultiPolygon<f64>> {
    let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
    match geo_geom {
        geo::Geometry::MultiPolygon(mp) => Some(mp),
        geo::Geometry::Polygon(p) => Some(MultiPolygon(vec![p])),
        _ => None,
    }
}

/// Compute the bounding box envelope for a [`MultiPolygon`].
fn compute_envelope(mp: &MultiPolygon<f64>) -> AABB<[f64; 2]> {
    use geo::BoundingRect;

    mp.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_polygon_geometry() {
        let geometry: geojson::Geometry = r#"{
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
        }"#
        .parse()
        .unwrap();

        let mp = geometry_to_multipolygon(geometry).unwrap();
        assert_eq!(mp.0.len(), 1);

        let env = compute_envelope(&mp);
        assert_eq!(env.lower(), [0.0, 0.0]);
        assert_eq!(env.upper(), [1.0, 1.0]);
    }

    #[test]
    fn rejects_point_geometry() {
        let geometry: geojson::Geometry = r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#
            .parse()
            .unwrap();
        assert!(geometry_to_multipolygon(geometry).is_none());
    }
}
