#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-tile matching of detected trees to census trees.
//!
//! A tile is processed in three steps:
//!
//! 1. [`TreeMatcher::attach`] tags each detected tree with its borough
//!    and shading statistics, producing a [`ShadedTree`].
//! 2. [`TreeMatcher::match_tile`] builds the tile's [`CensusIndex`],
//!    finds the nearest census tree for every detected tree, and resolves
//!    competing claims (see [`nearest`]).
//! 3. [`TileMatch`] turns the result into one [`EnrichedRecord`] per
//!    detected tree, either eagerly or through a lazy
//!    [`EnrichedRecords`] iterator.

pub mod canopy;
pub mod nearest;
pub mod record;
pub mod stream;

pub use canopy::canopy_radius;
pub use stream::EnrichedRecords;

use treefolio_spatial::{BoundaryIndex, BoundsBuffer, CensusIndex};
use treefolio_tree_models::{
    CensusTree, DetectedTree, EnrichedRecord, MatchCandidate, ShadeStats, ShadedTree,
};

/// Errors that can occur while matching a tile.
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    /// A detected tree has a non-finite predicted location.
    #[error("Tree {tree_count_id} in tile {tile_id} has a non-finite location")]
    InvalidLocation {
        /// Tile the tree belongs to.
        tile_id: String,
        /// Offending tree.
        tree_count_id: i64,
    },

    /// The census index returned no neighbor.
    #[error("Census index for tile {tile_id} returned no neighbor")]
    EmptyIndex {
        /// Tile being matched.
        tile_id: String,
    },
}

/// Matches detected trees against borough boundaries and the census.
///
/// Holds read-only references to the process-wide inputs, so one matcher
/// serves every tile of a run.
pub struct TreeMatcher<'a> {
    boundaries: &'a BoundaryIndex,
    census: &'a [CensusTree],
    buffer: BoundsBuffer,
}

impl<'a> TreeMatcher<'a> {
    #[must_use]
    pub const fn new(
        boundaries: &'a BoundaryIndex,
        census: &'a [CensusTree],
        buffer: BoundsBuffer,
    ) -> Self {
        Self {
            boundaries,
            census,
            buffer,
        }
    }

    /// Attaches the borough and shading statistics to a detected tree.
    #[must_use]
    pub fn attach(&self, detected: DetectedTree, shade: ShadeStats) -> ShadedTree {
        let borough = self.boundaries.lookup(detected.predicted_location);
        ShadedTree {
            detected,
            shade,
            borough,
        }
    }

    /// Matches a whole tile.
    ///
    /// When no census tree lies within the tile's buffered bounds (or the
    /// tile is empty) the nearest-neighbor step is skipped entirely and
    /// every record takes the unmatched path.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError`] if a detected tree has an unusable
    /// location. The tile must then be skipped as a whole.
    pub fn match_tile(
        &self,
        tile_id: &str,
        trees: Vec<ShadedTree>,
    ) -> Result<TileMatch, MatchError> {
        if let Some(bad) = trees
            .iter()
            .find(|t| !t.detected.predicted_location.is_finite())
        {
            return Err(MatchError::InvalidLocation {
                tile_id: tile_id.to_string(),
                tree_count_id: bad.detected.tree_count_id,
            });
        }

        let index = CensusIndex::for_tile(
            self.census,
            trees.iter().map(|t| t.detected.predicted_location),
            self.buffer,
        );

        let Some(index) = index else {
            log::info!(
                "Tile {tile_id}: no census trees within bounds, {} trees left unmatched",
                trees.len()
            );
            return Ok(TileMatch {
                trees,
                candidates: None,
                fallback_canopy_radius: None,
            });
        };

        let candidates = nearest::resolve(tile_id, trees.iter().map(|t| &t.detected), &index)?;
        let fallback_canopy_radius = Some(canopy_radius(index.mean_dbh()));

        log::debug!(
            "Tile {tile_id}: {} census trees in bounds, {} of {} detected trees hold a census id",
            index.len(),
            candidates.iter().filter(|c| c.has_census_id).count(),
            candidates.len()
        );

        Ok(TileMatch {
            trees,
            candidates: Some(candidates),
            fallback_canopy_radius,
        })
    }
}

/// The matched state of one tile, ready to become output records.
#[derive(Debug, Clone)]
pub struct TileMatch {
    trees: Vec<ShadedTree>,
    /// Aligned 1:1 with `trees`; `None` when the tile had no census
    /// coverage.
    candidates: Option<Vec<MatchCandidate>>,
    fallback_canopy_radius: Option<f64>,
}

impl TileMatch {
    /// Number of records this tile will produce.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Whether any census tree fell within the tile's bounds.
    #[must_use]
    pub const fn has_census_coverage(&self) -> bool {
        self.candidates.is_some()
    }

    /// Canopy radius assigned to records without a census match.
    #[must_use]
    pub const fn fallback_canopy_radius(&self) -> Option<f64> {
        self.fallback_canopy_radius
    }

    /// Builds every record up front.
    #[must_use]
    pub fn into_records(self) -> Vec<EnrichedRecord> {
        let mut records = Vec::with_capacity(self.trees.len());
        for (i, tree) in self.trees.iter().enumerate() {
            let candidate = self.candidates.as_ref().and_then(|c| c.get(i));
            records.push(record::build(
                &tree.detected,
                &tree.shade,
                tree.borough.as_ref(),
                candidate,
                self.fallback_canopy_radius,
            ));
        }
        records
    }

    /// Produces records lazily, one per detected tree.
    #[must_use]
    pub fn into_stream(self) -> EnrichedRecords {
        EnrichedRecords::new(self.trees, self.candidates, self.fallback_canopy_radius)
    }
}
