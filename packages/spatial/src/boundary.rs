//! Borough attribution via R-tree point-in-polygon lookups.

use geo::{Contains, MultiPolygon};
use rstar::{AABB, RTree, RTreeObject};
use treefolio_tree_models::{BoroughInfo, LonLat};

use crate::compute_envelope;

/// A borough boundary with its attributes.
#[derive(Debug, Clone)]
pub struct BoroughPolygon {
    /// Borough code (`boro_code`).
    pub code: String,
    /// Borough name (`boro_name`).
    pub name: String,
    /// Boundary in (lon, lat) degrees.
    pub geometry: MultiPolygon<f64>,
}

/// A boundary polygon stored in the R-tree with its insertion position.
struct BoundaryEntry {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for BoundaryEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Pre-built spatial index over borough polygons.
pub struct BoundaryIndex {
    polygons: Vec<BoroughPolygon>,
    tree: RTree<BoundaryEntry>,
}

impl BoundaryIndex {
    /// Builds the index, inserting each polygon's bounding box keyed by
    /// its position in `polygons`.
    #[must_use]
    pub fn build(polygons: Vec<BoroughPolygon>) -> Self {
        let entries = polygons
            .iter()
            .enumerate()
            .map(|(position, polygon)| BoundaryEntry {
                position,
                envelope: compute_envelope(&polygon.geometry),
            })
            .collect();

        let tree = RTree::bulk_load(entries);
        log::debug!("Built boundary index over {} polygons", polygons.len());

        Self { polygons, tree }
    }

    /// Look up the borough containing `point`.
    ///
    /// Boroughs do not overlap, so the first containing polygon wins.
    /// Candidates are tested in polygon position order. A point on a
    /// boundary edge or outside every polygon yields `None`.
    #[must_use]
    pub fn lookup(&self, point: LonLat) -> Option<BoroughInfo> {
        let query_env = AABB::from_point(point.to_array());
        let geo_point = geo::Point::new(point.lon, point.lat);

        let mut candidates: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_env)
            .map(|entry| entry.position)
            .collect();
        candidates.sort_unstable();

        candidates
            .into_iter()
            .map(|position| &self.polygons[position])
            .find(|polygon| polygon.geometry.contains(&geo_point))
            .map(|polygon| BoroughInfo {
                code: polygon.code.clone(),
                name: polygon.name.clone(),
            })
    }

    /// Number of indexed polygons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }
}
