#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Input parsing and storage access for the tree matching pipeline.
//!
//! - [`detected`] parses per-tree LiDAR detection JSON records.
//! - [`census`] parses street-tree census `GeoJSON` feature collections.
//! - [`boundary`] parses borough boundary `GeoJSON`.
//! - [`storage`] defines the read/write collaborators the pipeline is
//!   handed, with local filesystem and in-memory implementations.

pub mod boundary;
pub mod census;
pub mod detected;
pub mod storage;
mod value;

/// Errors that can occur while parsing pipeline inputs.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// I/O error reading an input file.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Record is not valid JSON.
    #[error("Invalid JSON in {key}: {source}")]
    Json {
        /// Storage key of the record.
        key: String,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// Input is not valid `GeoJSON`.
    #[error("Invalid GeoJSON: {0}")]
    GeoJson(#[from] geojson::Error),

    /// `GeoJSON` document is not a `FeatureCollection`.
    #[error("Expected a GeoJSON FeatureCollection")]
    NotFeatureCollection,

    /// An identity field (`Tree_CountId`, `PredictedTreeLocation`) is
    /// missing. The whole tile is unusable.
    #[error("Tile {tile_id}: record {key} is missing {field}")]
    MissingField {
        /// Tile the record belongs to.
        tile_id: String,
        /// Storage key of the record.
        key: String,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A measurement field is missing from a record whose identity is
    /// known. The tree cannot be enriched, so the whole tile is unusable.
    #[error("Tile {tile_id}: record {key} has no usable {field}")]
    IncompleteRecord {
        /// Tile the record belongs to.
        tile_id: String,
        /// Storage key of the record.
        key: String,
        /// Name of the missing field.
        field: &'static str,
    },
}

impl IngestError {
    /// Whether this error invalidates the whole tile rather than a single
    /// record. Only a document that is not JSON at all is skipped.
    #[must_use]
    pub const fn is_tile_fatal(&self) -> bool {
        !matches!(self, Self::Json { .. })
    }
}
