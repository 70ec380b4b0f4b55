//! Nearest census match and competing-claim resolution.
//!
//! Every detected tree claims its nearest census tree. When several
//! detected trees claim the same census tree, only the closest one keeps
//! the census identity; the others become unmatched but keep their
//! distance. This is a greedy per-census-tree minimum, not a global
//! assignment: a loser is never reassigned to its second-nearest tree.

use std::collections::BTreeMap;

use treefolio_spatial::CensusIndex;
use treefolio_tree_models::{CensusTree, DetectedTree, MatchCandidate};

use crate::MatchError;

/// Matches each detected tree to its nearest census tree and resolves
/// competing claims.
///
/// The returned candidates are in input order. Within a group claiming
/// the same census `tree_id`, the smallest distance wins; on an exact
/// tie the earliest tree in input order wins.
///
/// # Errors
///
/// Returns [`MatchError::EmptyIndex`] if the index yields no neighbor.
pub fn resolve<'a, I>(
    tile_id: &str,
    detected: I,
    index: &CensusIndex,
) -> Result<Vec<MatchCandidate>, MatchError>
where
    I: IntoIterator<Item = &'a DetectedTree>,
{
    let mut claims: Vec<(&DetectedTree, &CensusTree, f64)> = Vec::new();
    for tree in detected {
        let (census, distance) =
            index
                .nearest(tree.predicted_location)
                .ok_or_else(|| MatchError::EmptyIndex {
                    tile_id: tile_id.to_string(),
                })?;
        claims.push((tree, census, distance));
    }

    // census tree_id -> (position, distance) of the current winner
    let mut winners: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for (position, (_, census, distance)) in claims.iter().enumerate() {
        winners
            .entry(census.tree_id)
            .and_modify(|best| {
                if *distance < best.1 {
                    *best = (position, *distance);
                }
            })
            .or_insert((position, *distance));
    }

    let candidates = claims
        .into_iter()
        .enumerate()
        .map(|(position, (tree, census, distance))| {
            let is_nearest = winners
                .get(&census.tree_id)
                .is_some_and(|(winner, _)| *winner == position);

            if is_nearest {
                MatchCandidate {
                    detected: tree.clone(),
                    census: Some(census.clone()),
                    distance,
                    is_nearest: true,
                    has_census_id: true,
                    updated_location: census.location,
                }
            } else {
                MatchCandidate {
                    detected: tree.clone(),
                    census: None,
                    distance,
                    is_nearest: false,
                    has_census_id: false,
                    updated_location: tree.predicted_location,
                }
            }
        })
        .collect();

    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use treefolio_spatial::BoundingBox;
    use treefolio_tree_models::LonLat;

    use super::*;
    use crate::tests::{census, detected};

    fn index(trees: &[CensusTree]) -> CensusIndex {
        let bounds = BoundingBox {
            min_lon: -1.0,
            min_lat: -1.0,
            max_lon: 1.0,
            max_lat: 1.0,
        };
        CensusIndex::build(trees, &bounds).unwrap()
    }

    #[test]
    fn closest_claimant_wins() {
        let idx = index(&[census(10, 0.0, 0.0, 8.0), census(20, 0.5, 0.0, 8.0)]);
        let trees = [
            detected(1, 0.02, 0.0),
            detected(2, 0.01, 0.0),
            detected(3, 0.45, 0.0),
        ];

        let candidates = resolve("t", &trees, &idx).unwrap();
        assert!(!candidates[0].is_nearest);
        assert!(candidates[0].census.is_none());
        assert_eq!(candidates[0].updated_location, LonLat::new(0.02, 0.0));
        assert!((candidates[0].distance - 0.02).abs() < 1e-12);

        assert!(candidates[1].is_nearest);
        assert_eq!(candidates[1].census.as_ref().unwrap().tree_id, 10);
        assert_eq!(candidates[1].updated_location, LonLat::new(0.0, 0.0));

        assert!(candidates[2].is_nearest);
        assert_eq!(candidates[2].census.as_ref().unwrap().tree_id, 20);
    }

    #[test]
    fn exact_tie_goes_to_first_in_input_order() {
        let idx = index(&[census(10, 0.0, 0.0, 8.0)]);
        let trees = [detected(7, 0.1, 0.0), detected(3, -0.1, 0.0)];

        let candidates = resolve("t", &trees, &idx).unwrap();
        assert!(candidates[0].is_nearest);
        assert!(!candidates[1].is_nearest);
    }

    #[test]
    fn duplicate_count_ids_still_yield_one_winner() {
        let idx = index(&[census(10, 0.0, 0.0, 8.0)]);
        let trees = [detected(5, 0.2, 0.0), detected(5, 0.1, 0.0)];

        let candidates = resolve("t", &trees, &idx).unwrap();
        let winners: Vec<bool> = candidates.iter().map(|c| c.is_nearest).collect();
        assert_eq!(winners, vec![false, true]);
    }

    #[test]
    fn at_most_one_winner_per_census_tree() {
        let census_trees: Vec<CensusTree> = (0..5)
            .map(|i| census(i, f64::from(i32::try_from(i).unwrap()) * 0.1, 0.0, 6.0))
            .collect();
        let idx = index(&census_trees);
        let trees: Vec<DetectedTree> = (0..40)
            .map(|i| detected(i, f64::from(i32::try_from(i).unwrap()) * 0.0123, 0.001))
            .collect();

        let candidates = resolve("t", &trees, &idx).unwrap();
        assert_eq!(candidates.len(), trees.len());

        let mut per_census: BTreeMap<i64, usize> = BTreeMap::new();
        for c in &candidates {
            if let Some(census) = &c.census {
                *per_census.entry(census.tree_id).or_default() += 1;
                assert!(c.has_census_id);
                assert_eq!(c.updated_location, census.location);
            } else {
                assert!(!c.has_census_id);
                assert_eq!(c.updated_location, c.detected.predicted_location);
            }
        }
        assert!(per_census.values().all(|&n| n == 1));
    }
}
