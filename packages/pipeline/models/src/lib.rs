#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Configuration and result types for the tree matching pipeline.

pub mod progress;

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Output serialization of a tile's enriched records.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum OutputFormat {
    /// A `FeatureCollection` of point features.
    #[default]
    Geojson,
    /// A flat table with one row per record.
    Csv,
}

impl OutputFormat {
    /// File extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Geojson => "geojson",
            Self::Csv => "csv",
        }
    }

    /// Name of the output written for `tile_id`.
    #[must_use]
    pub fn output_name(self, tile_id: &str) -> String {
        format!("MatchedTrees_{tile_id}.{}", self.extension())
    }
}

/// Pipeline parameters, loaded from TOML.
///
/// Every field has a default, so an empty document (or no file at all)
/// is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root holding `{tile}/{year}/...` detected-tree and shading data.
    pub input_dir: PathBuf,
    /// Directory of census `.geojson` files.
    pub census_dir: PathBuf,
    /// Borough boundary `GeoJSON` file.
    pub boundary_path: PathBuf,
    /// Destination for per-tile outputs.
    pub output_dir: PathBuf,
    /// Recorded-year directory under each tile.
    pub year: String,
    /// Date the shading simulation represents.
    pub reference_date: NaiveDate,
    /// Longitude degrees added around a tile's detected trees.
    pub lon_buffer: f64,
    /// Latitude degrees added around a tile's detected trees.
    pub lat_buffer: f64,
    /// First hour (inclusive) of the high-temperature window.
    pub high_temp_start_hour: u32,
    /// Last hour (inclusive) of the high-temperature window.
    pub high_temp_end_hour: u32,
    /// Detected-tree records read and shaded per chunk.
    pub batch_size: usize,
    pub output_format: OutputFormat,
    /// Produce records through the lazy stream instead of a `Vec`.
    pub streaming: bool,
    /// Tiles to process. `None` means every tile in `input_dir`.
    pub tiles: Option<Vec<String>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("data/tiles"),
            census_dir: PathBuf::from("data/census"),
            boundary_path: PathBuf::from("data/borough_boundaries.geojson"),
            output_dir: PathBuf::from("output"),
            year: "2017".to_string(),
            reference_date: NaiveDate::from_ymd_opt(2017, 6, 21).unwrap_or_default(),
            lon_buffer: 9.009e-5,
            lat_buffer: 1.0484e-4,
            high_temp_start_hour: 11,
            high_temp_end_hour: 15,
            batch_size: 100,
            output_format: OutputFormat::Geojson,
            streaming: false,
            tiles: None,
        }
    }
}

/// What happened to one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileOutcome {
    /// Output written with this many records.
    Written { records: usize },
    /// Output already existed; nothing was done.
    SkippedExisting,
    /// The tile was skipped; no output was written.
    Failed { reason: String },
}

/// Per-run totals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub written: Vec<String>,
    pub skipped_existing: Vec<String>,
    /// `(tile_id, reason)` for every failed tile.
    pub failed: Vec<(String, String)>,
    pub records: usize,
}

impl RunSummary {
    pub fn record(&mut self, tile_id: &str, outcome: TileOutcome) {
        match outcome {
            TileOutcome::Written { records } => {
                self.written.push(tile_id.to_string());
                self.records += records;
            }
            TileOutcome::SkippedExisting => self.skipped_existing.push(tile_id.to_string()),
            TileOutcome::Failed { reason } => self.failed.push((tile_id.to_string(), reason)),
        }
    }

    #[must_use]
    pub fn tiles_seen(&self) -> usize {
        self.written.len() + self.skipped_existing.len() + self.failed.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles written ({} records), {} already processed, {} failed",
            self.written.len(),
            self.records,
            self.skipped_existing.len(),
            self.failed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn output_format_parses_case_insensitively() {
        assert_eq!(OutputFormat::from_str("csv").unwrap(), OutputFormat::Csv);
        assert_eq!(OutputFormat::from_str("GeoJSON").unwrap(), OutputFormat::Geojson);
        assert!(OutputFormat::from_str("shp").is_err());
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn output_name_uses_extension() {
        assert_eq!(
            OutputFormat::Geojson.output_name("987185"),
            "MatchedTrees_987185.geojson"
        );
        assert_eq!(OutputFormat::Csv.output_name("1"), "MatchedTrees_1.csv");
    }

    #[test]
    fn empty_toml_is_default_config() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: PipelineConfig = toml::from_str(
            r#"
            input_dir = "/data/lidar"
            reference_date = "2018-06-21"
            output_format = "csv"
            batch_size = 50
            tiles = ["987185", "987190"]
            "#,
        )
        .unwrap();

        assert_eq!(config.input_dir, PathBuf::from("/data/lidar"));
        assert_eq!(
            config.reference_date,
            NaiveDate::from_ymd_opt(2018, 6, 21).unwrap()
        );
        assert_eq!(config.output_format, OutputFormat::Csv);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.tiles.as_deref().unwrap().len(), 2);
        assert_eq!(config.year, "2017");
        assert_eq!(config.high_temp_end_hour, 15);
    }

    #[test]
    fn summary_counts_outcomes() {
        let mut summary = RunSummary::default();
        summary.record("a", TileOutcome::Written { records: 4 });
        summary.record("b", TileOutcome::Written { records: 6 });
        summary.record("c", TileOutcome::SkippedExisting);
        summary.record(
            "d",
            TileOutcome::Failed {
                reason: "missing input".to_string(),
            },
        );

        assert_eq!(summary.tiles_seen(), 4);
        assert_eq!(summary.records, 10);
        assert_eq!(
            summary.to_string(),
            "2 tiles written (10 records), 1 already processed, 1 failed"
        );
    }
}
