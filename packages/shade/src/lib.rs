#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-tree shading statistics.
//!
//! The shading simulation writes one CSV time series per detected tree.
//! [`ShadeSummarizer`] reduces a series to the fixed 13-value
//! [`ShadeStats`] record:
//!
//! 1. Rows are restricted to the reference date (the summer solstice of
//!    the simulated year).
//! 2. **Peak**: mean over the rows at maximum sun amplitude (all tied
//!    rows are averaged).
//! 3. **Daily**: mean over every row of the reference date.
//! 4. **High-temperature hours**: mean over rows whose hour lies within
//!    the configured inclusive window (11:00-15:59 by default).
//!
//! The mean of an empty set is `None`, never `NaN` or zero.

pub mod parse;

use chrono::{NaiveDate, Timelike};
use serde::{Deserialize, Serialize};
use treefolio_tree_models::{PeakShade, ShadeAverages, ShadeSample, ShadeStats};

pub use parse::parse_shade_csv;

/// Errors that can occur while reading a shading CSV.
#[derive(Debug, thiserror::Error)]
pub enum ShadeError {
    /// The CSV could not be read at all.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is absent from the header row.
    #[error("Missing shading column: {column}")]
    MissingColumn {
        /// Name of the missing column.
        column: String,
    },
}

/// Shading summary parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShadeConfig {
    /// Calendar date the shading simulation represents.
    pub reference_date: NaiveDate,
    /// First hour (inclusive) of the high-temperature window.
    pub high_temp_start_hour: u32,
    /// Last hour (inclusive) of the high-temperature window.
    pub high_temp_end_hour: u32,
}

impl Default for ShadeConfig {
    fn default() -> Self {
        Self {
            reference_date: default_reference_date(),
            high_temp_start_hour: 11,
            high_temp_end_hour: 15,
        }
    }
}

/// June 21, 2017: the solstice the 2017 shading simulation was run for.
#[must_use]
pub fn default_reference_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2017, 6, 21).unwrap_or_default()
}

/// Reduces shading time series to [`ShadeStats`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ShadeSummarizer {
    config: ShadeConfig,
}

impl ShadeSummarizer {
    #[must_use]
    pub const fn new(config: ShadeConfig) -> Self {
        Self { config }
    }

    /// Summarizes one tree's time series.
    ///
    /// An empty input, or one with no rows on the reference date, yields
    /// all-`None` statistics.
    #[must_use]
    pub fn summarize(&self, samples: &[ShadeSample]) -> ShadeStats {
        let day: Vec<&ShadeSample> = samples
            .iter()
            .filter(|s| s.timestamp.date() == self.config.reference_date)
            .collect();

        if day.is_empty() {
            return ShadeStats::default();
        }

        let max_amplitude = day
            .iter()
            .map(|s| s.sun_amplitude)
            .fold(f64::NEG_INFINITY, f64::max);

        #[allow(clippy::float_cmp)]
        let peak_rows: Vec<&ShadeSample> = day
            .iter()
            .copied()
            .filter(|s| s.sun_amplitude == max_amplitude)
            .collect();

        let hours = self.config.high_temp_start_hour..=self.config.high_temp_end_hour;
        let hot_rows: Vec<&ShadeSample> = day
            .iter()
            .copied()
            .filter(|s| hours.contains(&s.timestamp.hour()))
            .collect();

        ShadeStats {
            peak: peak_shade(&peak_rows),
            daily: averages(&day),
            high_temp_hours: averages(&hot_rows),
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn peak_shade(rows: &[&ShadeSample]) -> PeakShade {
    let base = averages(rows);
    PeakShade {
        tree_shadow_point_count: mean(rows.iter().map(|s| s.tree_shadow_point_count as f64)),
        shaded_area: base.shaded_area,
        shaded_area_ground: base.shaded_area_ground,
        perc_canopy_street_shade: base.perc_canopy_street_shade,
        perc_canopy_in_shade: base.perc_canopy_in_shade,
    }
}

fn averages(rows: &[&ShadeSample]) -> ShadeAverages {
    ShadeAverages {
        shaded_area: mean(rows.iter().map(|s| s.shadow_area)),
        shaded_area_ground: mean(rows.iter().map(|s| s.shadow_area_ground)),
        perc_canopy_street_shade: mean(rows.iter().map(|s| s.pct_canopy_street_shade)),
        perc_canopy_in_shade: mean(rows.iter().map(|s| s.pct_canopy_in_shade)),
    }
}

/// Arithmetic mean of the finite values; `None` when there are none.
#[allow(clippy::cast_precision_loss)]
fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
