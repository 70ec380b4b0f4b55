//! Configuration loading and tile selection.
//!
//! Precedence, highest first: command-line flags, the
//! [`TILES_ENV`] environment variable (tile list only), the TOML file,
//! built-in defaults.

use std::path::{Path, PathBuf};

use treefolio_pipeline_models::{OutputFormat, PipelineConfig};
use treefolio_shade::ShadeConfig;
use treefolio_spatial::BoundsBuffer;

/// Config file read when no `--config` is given, if present.
pub const DEFAULT_CONFIG_FILE: &str = "treefolio.toml";

/// Comma-separated tile filter.
pub const TILES_ENV: &str = "TREEFOLIO_TILES";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Loads the pipeline configuration.
///
/// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
/// is used if it exists and the defaults otherwise.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.is_file() {
                log::debug!("No {DEFAULT_CONFIG_FILE} found, using default configuration");
                return Ok(PipelineConfig::default());
            }
            default
        }
    };

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.display().to_string(),
        source,
    })?;

    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Command-line values that replace configured ones when present.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub census_dir: Option<PathBuf>,
    pub boundary_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub year: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub batch_size: Option<usize>,
    pub streaming: bool,
}

impl Overrides {
    pub fn apply(self, config: &mut PipelineConfig) {
        if let Some(v) = self.input_dir {
            config.input_dir = v;
        }
        if let Some(v) = self.census_dir {
            config.census_dir = v;
        }
        if let Some(v) = self.boundary_path {
            config.boundary_path = v;
        }
        if let Some(v) = self.output_dir {
            config.output_dir = v;
        }
        if let Some(v) = self.year {
            config.year = v;
        }
        if let Some(v) = self.output_format {
            config.output_format = v;
        }
        if let Some(v) = self.batch_size {
            config.batch_size = v;
        }
        if self.streaming {
            config.streaming = true;
        }
    }
}

/// Splits a comma-separated tile list, dropping empty entries.
#[must_use]
pub fn parse_tile_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Picks the tiles to process.
///
/// The first of `cli_filter`, `env_filter`, and the configured list that
/// is present wins; with none of them every `available` tile is used.
/// Requested tiles need not be in `available`: a missing tile is
/// reported when it is processed.
#[must_use]
pub fn select_tiles(
    cli_filter: Option<String>,
    env_filter: Option<String>,
    configured: Option<&[String]>,
    available: Vec<String>,
) -> Vec<String> {
    if let Some(filter) = cli_filter.or(env_filter) {
        return parse_tile_list(&filter);
    }
    configured.map_or(available, <[String]>::to_vec)
}

/// Reads the [`TILES_ENV`] filter, if set.
#[must_use]
pub fn tiles_from_env() -> Option<String> {
    std::env::var(TILES_ENV).ok()
}

#[must_use]
pub const fn shade_config(config: &PipelineConfig) -> ShadeConfig {
    ShadeConfig {
        reference_date: config.reference_date,
        high_temp_start_hour: config.high_temp_start_hour,
        high_temp_end_hour: config.high_temp_end_hour,
    }
}

#[must_use]
pub const fn bounds_buffer(config: &PipelineConfig) -> BoundsBuffer {
    BoundsBuffer {
        lon: config.lon_buffer,
        lat: config.lat_buffer,
    }
}
