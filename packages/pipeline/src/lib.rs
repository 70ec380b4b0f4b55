#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-tile tree matching pipeline.
//!
//! [`Pipeline`] holds the process-wide inputs (borough index and census
//! trees) and processes tiles one at a time. Each tile is an isolated
//! unit: its output is encoded in full and then written atomically, and
//! a failing tile is logged and skipped without affecting the others.
//! Tiles whose output already exists are skipped unless forced, so an
//! interrupted run resumes where it stopped.

pub mod config;
pub mod output;
pub mod tile;

use std::sync::Arc;

use treefolio_ingest::IngestError;
use treefolio_ingest::boundary::load_borough_boundaries;
use treefolio_ingest::census::load_census_dir;
use treefolio_ingest::storage::{OutputSink, StorageError, TileSource};
use treefolio_matching::{MatchError, TreeMatcher};
use treefolio_pipeline_models::progress::ProgressCallback;
use treefolio_pipeline_models::{OutputFormat, PipelineConfig, RunSummary, TileOutcome};
use treefolio_shade::ShadeSummarizer;
use treefolio_spatial::BoundaryIndex;
use treefolio_tree_models::CensusTree;

use crate::output::OutputError;

/// Errors that abort a single tile.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// The tile has no detected-tree data.
    #[error("Tile {tile_id}: no detected-tree records found")]
    MissingInput {
        /// Tile being processed.
        tile_id: String,
    },

    /// A listed input could not be read.
    #[error("Tile {tile_id}: {source}")]
    Read {
        /// Tile being processed.
        tile_id: String,
        /// Underlying storage error.
        source: StorageError,
    },

    /// A record is unusable in a way that invalidates the tile.
    #[error("Tile {tile_id}: {source}")]
    Ingest {
        /// Tile being processed.
        tile_id: String,
        /// Underlying parse error.
        source: IngestError,
    },

    /// Matching failed.
    #[error(transparent)]
    Match(#[from] MatchError),

    /// Records could not be encoded.
    #[error("Tile {tile_id}: failed to encode output: {source}")]
    Encode {
        /// Tile being processed.
        tile_id: String,
        /// Underlying encoding error.
        source: OutputError,
    },

    /// The encoded output could not be persisted.
    #[error("Tile {tile_id}: failed to write output: {source}")]
    OutputWrite {
        /// Tile being processed.
        tile_id: String,
        /// Underlying storage error.
        source: StorageError,
    },
}

/// Errors loading the process-wide inputs.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to load {what}: {source}")]
    Load {
        /// Which input failed.
        what: &'static str,
        source: IngestError,
    },
}

/// The tile processor.
pub struct Pipeline {
    config: PipelineConfig,
    boundaries: BoundaryIndex,
    census: Vec<CensusTree>,
    summarizer: ShadeSummarizer,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, boundaries: BoundaryIndex, census: Vec<CensusTree>) -> Self {
        let summarizer = ShadeSummarizer::new(config::shade_config(&config));
        Self {
            config,
            boundaries,
            census,
            summarizer,
        }
    }

    /// Loads borough boundaries and census trees from the configured
    /// paths.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if either input cannot be loaded.
    pub fn load(config: PipelineConfig) -> Result<Self, PipelineError> {
        let polygons = load_borough_boundaries(&config.boundary_path).map_err(|source| {
            PipelineError::Load {
                what: "borough boundaries",
                source,
            }
        })?;
        let boundaries = BoundaryIndex::build(polygons);
        let census = load_census_dir(&config.census_dir).map_err(|source| PipelineError::Load {
            what: "census trees",
            source,
        })?;
        log::info!(
            "Loaded {} borough polygons and {} census trees",
            boundaries.len(),
            census.len()
        );
        Ok(Self::new(config, boundaries, census))
    }

    /// Output name for `tile_id` in the configured format.
    #[must_use]
    pub fn output_name(&self, tile_id: &str) -> String {
        self.config.output_format.output_name(tile_id)
    }

    /// Processes one tile end to end and writes its output.
    ///
    /// Returns the number of records written.
    ///
    /// # Errors
    ///
    /// Returns [`TileError`] if the tile must be skipped. Nothing is
    /// written in that case.
    pub fn process_tile(
        &self,
        source: &dyn TileSource,
        sink: &dyn OutputSink,
        tile_id: &str,
    ) -> Result<usize, TileError> {
        let matcher = TreeMatcher::new(
            &self.boundaries,
            &self.census,
            config::bounds_buffer(&self.config),
        );

        let trees = tile::load_shaded_trees(
            source,
            tile_id,
            &matcher,
            &self.summarizer,
            self.config.batch_size,
        )?;
        let matched = matcher.match_tile(tile_id, trees)?;

        let format = self.config.output_format;
        let mut bytes = Vec::new();
        let encoded = if self.config.streaming {
            output::encode(format, matched.into_stream(), &mut bytes)
        } else {
            output::encode(format, matched.into_records(), &mut bytes)
        };
        let count = encoded.map_err(|source| TileError::Encode {
            tile_id: tile_id.to_string(),
            source,
        })?;

        let name = self.output_name(tile_id);
        sink.write(&name, &bytes)
            .map_err(|source| TileError::OutputWrite {
                tile_id: tile_id.to_string(),
                source,
            })?;

        Ok(count)
    }

    /// Processes `tiles` in order, isolating failures per tile.
    ///
    /// Tiles with existing output are skipped unless `force` is set.
    pub fn run(
        &self,
        source: &dyn TileSource,
        sink: &dyn OutputSink,
        tiles: &[String],
        force: bool,
        progress: &Arc<dyn ProgressCallback>,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        progress.set_total(tiles.len() as u64);

        for tile_id in tiles {
            progress.set_message(format!("Tile {tile_id}"));
            let outcome = self.run_tile(source, sink, tile_id, force);
            summary.record(tile_id, outcome);
            progress.inc(1);
        }

        progress.finish(summary.to_string());
        log::info!("Run complete: {summary}");
        for (tile_id, reason) in &summary.failed {
            log::info!("  failed: {tile_id} ({reason})");
        }

        summary
    }

    fn run_tile(
        &self,
        source: &dyn TileSource,
        sink: &dyn OutputSink,
        tile_id: &str,
        force: bool,
    ) -> TileOutcome {
        let name = self.output_name(tile_id);
        if !force && sink.exists(&name) {
            log::info!("Tile {tile_id}: {name} already exists, skipping");
            return TileOutcome::SkippedExisting;
        }

        log::info!("Tile {tile_id}: processing");
        match self.process_tile(source, sink, tile_id) {
            Ok(records) => {
                log::info!("Tile {tile_id}: wrote {records} records to {name}");
                TileOutcome::Written { records }
            }
            Err(e) => {
                log::error!("Skipping tile {tile_id}: {e}");
                TileOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Whether each tile already has output in `format`.
#[must_use]
pub fn tile_status(
    sink: &dyn OutputSink,
    format: OutputFormat,
    tiles: &[String],
) -> Vec<(String, bool)> {
    tiles
        .iter()
        .map(|t| (t.clone(), sink.exists(&format.output_name(t))))
        .collect()
}
