//! Nearest-neighbor index over census street trees near one tile.
//!
//! Distances are plain Euclidean distances in (lon, lat) degree space,
//! not geodesic distances. Match outcomes depend on this metric.

use rstar::RTree;
use rstar::primitives::GeomWithData;
use treefolio_tree_models::{CensusTree, LonLat};

/// Default longitude buffer, roughly 10 m at New York latitudes.
pub const DEFAULT_LON_BUFFER: f64 = 9.009e-5;

/// Default latitude buffer, roughly 10 m at New York latitudes.
pub const DEFAULT_LAT_BUFFER: f64 = 1.0484e-4;

/// Degrees added on each side of a tile's detected-tree extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsBuffer {
    pub lon: f64,
    pub lat: f64,
}

impl Default for BoundsBuffer {
    fn default() -> Self {
        Self {
            lon: DEFAULT_LON_BUFFER,
            lat: DEFAULT_LAT_BUFFER,
        }
    }
}

/// Axis-aligned bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Bounding box of `points` expanded by `buffer`.
    ///
    /// Returns `None` when `points` is empty.
    #[must_use]
    pub fn around<I>(points: I, buffer: BoundsBuffer) -> Option<Self>
    where
        I: IntoIterator<Item = LonLat>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;

        let mut bbox = Self {
            min_lon: first.lon,
            min_lat: first.lat,
            max_lon: first.lon,
            max_lat: first.lat,
        };
        for p in points {
            bbox.min_lon = bbox.min_lon.min(p.lon);
            bbox.min_lat = bbox.min_lat.min(p.lat);
            bbox.max_lon = bbox.max_lon.max(p.lon);
            bbox.max_lat = bbox.max_lat.max(p.lat);
        }

        bbox.min_lon -= buffer.lon;
        bbox.max_lon += buffer.lon;
        bbox.min_lat -= buffer.lat;
        bbox.max_lat += buffer.lat;

        Some(bbox)
    }

    /// Strict interior test; points on the edge are outside.
    #[must_use]
    pub fn contains(&self, p: LonLat) -> bool {
        p.lon > self.min_lon && p.lon < self.max_lon && p.lat > self.min_lat && p.lat < self.max_lat
    }
}

type CensusPoint = GeomWithData<[f64; 2], usize>;

/// Nearest-neighbor index over the census trees inside a tile's bounds.
pub struct CensusIndex {
    trees: Vec<CensusTree>,
    tree: RTree<CensusPoint>,
}

impl CensusIndex {
    /// Builds the index from the census trees strictly inside `bounds`.
    ///
    /// Returns `None` if no census tree falls within the bounds; callers
    /// then take the unmatched path for the whole tile.
    #[must_use]
    pub fn build(census_trees: &[CensusTree], bounds: &BoundingBox) -> Option<Self> {
        let trees: Vec<CensusTree> = census_trees
            .iter()
            .filter(|t| bounds.contains(t.location))
            .cloned()
            .collect();

        if trees.is_empty() {
            return None;
        }

        let points = trees
            .iter()
            .enumerate()
            .map(|(i, t)| GeomWithData::new(t.location.to_array(), i))
            .collect();

        Some(Self {
            trees,
            tree: RTree::bulk_load(points),
        })
    }

    /// Builds the index for a tile from its detected-tree locations.
    ///
    /// Returns `None` when there are no detected locations (the bounds
    /// are undefined) or no census tree lies within the buffered bounds.
    #[must_use]
    pub fn for_tile<I>(census_trees: &[CensusTree], detected: I, buffer: BoundsBuffer) -> Option<Self>
    where
        I: IntoIterator<Item = LonLat>,
    {
        let bounds = BoundingBox::around(detected, buffer)?;
        Self::build(census_trees, &bounds)
    }

    /// Returns the nearest census tree to `point` and its Euclidean
    /// distance in degrees.
    #[must_use]
    pub fn nearest(&self, point: LonLat) -> Option<(&CensusTree, f64)> {
        use rstar::PointDistance;

        let query = point.to_array();
        let hit = self.tree.nearest_neighbor(&query)?;
        let distance = hit.distance_2(&query).sqrt();
        Some((&self.trees[hit.data], distance))
    }

    /// Mean diameter at breast height over the indexed trees.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_dbh(&self) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.dbh).sum();
        sum / self.trees.len() as f64
    }

    /// The census trees inside the tile bounds, in input order.
    #[must_use]
    pub fn trees(&self) -> &[CensusTree] {
        &self.trees
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn census(tree_id: i64, lon: f64, lat: f64, dbh: f64) -> CensusTree {
        CensusTree {
            tree_id,
            location: LonLat::new(lon, lat),
            species_latin: Some("Platanus x acerifolia".to_string()),
            species_common: Some("London planetree".to_string()),
            dbh,
            curb_loc: Some("OnCurb".to_string()),
            status: Some("Alive".to_string()),
            health: Some("Good".to_string()),
            address: None,
            zipcode: None,
            borough_name: Some("Brooklyn".to_string()),
        }
    }

    #[test]
    fn bounds_expand_by_buffer() {
        let bbox = BoundingBox::around(
            [LonLat::new(-73.95, 40.65), LonLat::new(-73.94, 40.66)],
            BoundsBuffer::default(),
        )
        .unwrap();

        assert!((bbox.min_lon - (-73.95 - DEFAULT_LON_BUFFER)).abs() < 1e-12);
        assert!((bbox.max_lon - (-73.94 + DEFAULT_LON_BUFFER)).abs() < 1e-12);
        assert!((bbox.min_lat - (40.65 - DEFAULT_LAT_BUFFER)).abs() < 1e-12);
        assert!((bbox.max_lat - (40.66 + DEFAULT_LAT_BUFFER)).abs() < 1e-12);
    }

    #[test]
    fn bounds_of_nothing_is_none() {
        assert!(BoundingBox::around(std::iter::empty(), BoundsBuffer::default()).is_none());
        assert!(
            CensusIndex::for_tile(&[census(1, 0.0, 0.0, 5.0)], [], BoundsBuffer::default())
                .is_none()
        );
    }

    #[test]
    fn filters_to_bounds_and_returns_none_when_empty() {
        let trees = vec![census(1, 0.0, 0.0, 5.0), census(2, 10.0, 10.0, 5.0)];
        let buffer = BoundsBuffer { lon: 0.5, lat: 0.5 };

        let index = CensusIndex::for_tile(&trees, [LonLat::new(0.1, 0.1)], buffer).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.trees()[0].tree_id, 1);

        assert!(CensusIndex::for_tile(&trees, [LonLat::new(5.0, 5.0)], buffer).is_none());
    }

    #[test]
    fn nearest_returns_euclidean_distance() {
        let trees = vec![census(1, 0.0, 0.0, 5.0), census(2, 3.0, 4.0, 5.0)];
        let bounds = BoundingBox {
            min_lon: -10.0,
            min_lat: -10.0,
            max_lon: 10.0,
            max_lat: 10.0,
        };
        let index = CensusIndex::build(&trees, &bounds).unwrap();

        let (hit, distance) = index.nearest(LonLat::new(3.0, 3.0)).unwrap();
        assert_eq!(hit.tree_id, 2);
        assert!((distance - 1.0).abs() < 1e-12);

        let (hit, distance) = index.nearest(LonLat::new(0.0, 0.0)).unwrap();
        assert_eq!(hit.tree_id, 1);
        assert!(distance.abs() < 1e-12);
    }

    #[test]
    fn single_point_index_answers_every_query() {
        let bounds = BoundingBox {
            min_lon: -1.0,
            min_lat: -1.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        let index = CensusIndex::build(&[census(9, 0.5, 0.5, 12.0)], &bounds).unwrap();
        let (hit, _) = index.nearest(LonLat::new(-0.9, -0.9)).unwrap();
        assert_eq!(hit.tree_id, 9);
        assert!((index.mean_dbh() - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn mean_dbh_averages_all_trees() {
        let bounds = BoundingBox {
            min_lon: -1.0,
            min_lat: -1.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        let index = CensusIndex::build(
            &[census(1, 0.1, 0.1, 10.0), census(2, 0.2, 0.2, 20.0)],
            &bounds,
        )
        .unwrap();
        assert!((index.mean_dbh() - 15.0).abs() < f64::EPSILON);
    }
}
