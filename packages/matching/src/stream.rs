//! Lazy record production for a matched tile.

use std::iter::FusedIterator;

use treefolio_tree_models::{EnrichedRecord, MatchCandidate, ShadedTree};

use crate::record;

/// One-pass iterator over a tile's [`EnrichedRecord`]s.
///
/// Records are built on demand in detected-tree order and are identical
/// to those returned by [`crate::TileMatch::into_records`]. The iterator
/// owns the tile's data and cannot be restarted.
#[derive(Debug)]
pub struct EnrichedRecords {
    trees: std::vec::IntoIter<ShadedTree>,
    candidates: Option<std::vec::IntoIter<MatchCandidate>>,
    fallback_canopy_radius: Option<f64>,
}

impl EnrichedRecords {
    pub(crate) fn new(
        trees: Vec<ShadedTree>,
        candidates: Option<Vec<MatchCandidate>>,
        fallback_canopy_radius: Option<f64>,
    ) -> Self {
        Self {
            trees: trees.into_iter(),
            candidates: candidates.map(Vec::into_iter),
            fallback_canopy_radius,
        }
    }
}

impl Iterator for EnrichedRecords {
    type Item = EnrichedRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.trees.next()?;
        let candidate = self.candidates.as_mut().and_then(Iterator::next);

        Some(record::build(
            &tree.detected,
            &tree.shade,
            tree.borough.as_ref(),
            candidate.as_ref(),
            self.fallback_canopy_radius,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.trees.size_hint()
    }
}

impl ExactSizeIterator for EnrichedRecords {}

impl FusedIterator for EnrichedRecords {}

#[cfg(test)]
mod tests {
    use treefolio_tree_models::ShadeStats;

    use super::*;
    use crate::tests::detected;

    fn shaded(id: i64) -> ShadedTree {
        ShadedTree {
            detected: detected(id, 0.0, 0.0),
            shade: ShadeStats::default(),
            borough: None,
        }
    }

    #[test]
    fn yields_one_record_per_tree_then_stops() {
        let mut records = EnrichedRecords::new(vec![shaded(1), shaded(2)], None, None);
        assert_eq!(records.len(), 2);

        assert_eq!(records.next().unwrap().tree_count_id, 1);
        assert_eq!(records.len(), 1);
        assert_eq!(records.next().unwrap().tree_count_id, 2);
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }
}
