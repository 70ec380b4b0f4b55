//! Loading and enriching one tile's detected trees.

use treefolio_ingest::detected::parse_detected_tree;
use treefolio_ingest::storage::TileSource;
use treefolio_matching::TreeMatcher;
use treefolio_shade::{ShadeSummarizer, parse_shade_csv};
use treefolio_tree_models::{ShadeStats, ShadedTree};

use crate::TileError;

/// Reads a tile's detected trees in chunks of `batch_size`, attaching
/// shading statistics and borough to each.
///
/// Shading series are summarized and dropped one tree at a time, so peak
/// memory is bounded by the chunk rather than the tile. Chunking only
/// affects reading; the returned trees are the same for any batch size.
///
/// # Errors
///
/// * [`TileError::MissingInput`] if the tile has no detected-tree data.
/// * [`TileError::Read`] if a listed record cannot be read.
/// * [`TileError::Ingest`] if a JSON record lacks its id, location or a
///   measurement. Records that are not JSON at all are logged and skipped.
pub fn load_shaded_trees(
    source: &dyn TileSource,
    tile_id: &str,
    matcher: &TreeMatcher<'_>,
    summarizer: &ShadeSummarizer,
    batch_size: usize,
) -> Result<Vec<ShadedTree>, TileError> {
    let keys = source
        .tree_record_keys(tile_id)
        .map_err(|source| TileError::Read {
            tile_id: tile_id.to_string(),
            source,
        })?
        .ok_or_else(|| TileError::MissingInput {
            tile_id: tile_id.to_string(),
        })?;

    let mut trees = Vec::with_capacity(keys.len());
    let chunks = keys.chunks(batch_size.max(1));
    let chunk_count = chunks.len();

    for (n, chunk) in chunks.enumerate() {
        for key in chunk {
            let bytes = source.read(key).map_err(|source| TileError::Read {
                tile_id: tile_id.to_string(),
                source,
            })?;

            let detected = match parse_detected_tree(&bytes, tile_id, key) {
                Ok(tree) => tree,
                Err(e) if e.is_tile_fatal() => {
                    return Err(TileError::Ingest {
                        tile_id: tile_id.to_string(),
                        source: e,
                    });
                }
                Err(e) => {
                    log::warn!("Skipping record: {e}");
                    continue;
                }
            };

            let shade = shade_stats(source, tile_id, detected.tree_count_id, summarizer);
            trees.push(matcher.attach(detected, shade));
        }

        if chunk_count > 1 {
            log::debug!(
                "Tile {tile_id}: batch {}/{chunk_count} done, {} trees so far",
                n + 1,
                trees.len()
            );
        }
    }

    Ok(trees)
}

/// Summarizes one tree's shading CSV. Missing or unreadable data yields
/// empty statistics.
fn shade_stats(
    source: &dyn TileSource,
    tile_id: &str,
    tree_count_id: i64,
    summarizer: &ShadeSummarizer,
) -> ShadeStats {
    let bytes = match source.read_shade_csv(tile_id, tree_count_id) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return ShadeStats::default(),
        Err(e) => {
            log::warn!("Tile {tile_id}: tree {tree_count_id} shading unreadable: {e}");
            return ShadeStats::default();
        }
    };

    match parse_shade_csv(&bytes) {
        Ok(samples) => summarizer.summarize(&samples),
        Err(e) => {
            log::warn!("Tile {tile_id}: tree {tree_count_id} shading CSV invalid: {e}");
            ShadeStats::default()
        }
    }
}
