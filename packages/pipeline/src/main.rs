#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the tree matching pipeline.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use treefolio_cli_utils::{IndicatifProgress, init_logger};
use treefolio_ingest::storage::{LocalOutputSink, LocalTileSource, TileSource};
use treefolio_pipeline::{Pipeline, tile_status};
use treefolio_pipeline::config::{
    Overrides, load_config, select_tiles, shade_config, tiles_from_env,
};
use treefolio_pipeline_models::{OutputFormat, PipelineConfig};
use treefolio_shade::{ShadeSummarizer, parse_shade_csv};

#[derive(Parser)]
#[command(name = "treefolio", about = "Match LiDAR-detected trees to the street-tree census")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigArgs {
    /// TOML config file (default: `treefolio.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Root of the per-tile detected-tree and shading data
    #[arg(long, global = true)]
    input_dir: Option<PathBuf>,
    /// Directory of census `.geojson` files
    #[arg(long, global = true)]
    census_dir: Option<PathBuf>,
    /// Borough boundary `GeoJSON` file
    #[arg(long, global = true)]
    boundary_path: Option<PathBuf>,
    /// Directory for per-tile outputs
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,
    /// Recorded-year directory under each tile
    #[arg(long, global = true)]
    year: Option<String>,
    /// Output format (`geojson` or `csv`)
    #[arg(long, global = true)]
    format: Option<OutputFormat>,
    /// Detected-tree records read per chunk
    #[arg(long, global = true)]
    batch_size: Option<usize>,
    /// Produce records lazily instead of collecting each tile first
    #[arg(long, global = true)]
    streaming: bool,
    /// Comma-separated tile ids (overrides `TREEFOLIO_TILES` env var)
    #[arg(long, global = true)]
    tiles: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process tiles (the default)
    Run {
        /// Reprocess tiles whose output already exists
        #[arg(long)]
        force: bool,
    },
    /// Print the shading statistics of one shading CSV as JSON
    SummarizeShade {
        /// Path to the CSV
        csv: PathBuf,
    },
    /// List tiles and whether each already has output
    Tiles,
}

impl ConfigArgs {
    fn resolve(&self) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
        let mut config = load_config(self.config.as_deref())?;
        Overrides {
            input_dir: self.input_dir.clone(),
            census_dir: self.census_dir.clone(),
            boundary_path: self.boundary_path.clone(),
            output_dir: self.output_dir.clone(),
            year: self.year.clone(),
            output_format: self.format,
            batch_size: self.batch_size,
            streaming: self.streaming,
        }
        .apply(&mut config);
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = init_logger();
    let cli = Cli::parse();
    let config = cli.config.resolve()?;

    let source = LocalTileSource::new(&config.input_dir, config.year.clone());
    let sink = LocalOutputSink::new(&config.output_dir);

    match cli.command.unwrap_or(Commands::Run { force: false }) {
        Commands::SummarizeShade { csv } => {
            let bytes = std::fs::read(&csv)?;
            let samples = parse_shade_csv(&bytes)?;
            let stats = ShadeSummarizer::new(shade_config(&config)).summarize(&samples);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Tiles => {
            let tiles = select_tiles(
                cli.config.tiles.clone(),
                tiles_from_env(),
                config.tiles.as_deref(),
                source.list_tiles()?,
            );
            println!("{:<16} PROCESSED", "TILE");
            println!("{}", "-".repeat(28));
            for (tile, done) in tile_status(&sink, config.output_format, &tiles) {
                println!("{tile:<16} {}", if done { "yes" } else { "no" });
            }
        }
        Commands::Run { force } => {
            let start = Instant::now();
            let tiles = select_tiles(
                cli.config.tiles.clone(),
                tiles_from_env(),
                config.tiles.as_deref(),
                source.list_tiles()?,
            );
            log::info!(
                "Processing {} tile(s) from {} into {}",
                tiles.len(),
                config.input_dir.display(),
                config.output_dir.display()
            );

            let pipeline = Pipeline::load(config)?;
            let progress = IndicatifProgress::tiles_bar(&multi, "Tiles", tiles.len() as u64);
            let summary = pipeline.run(&source, &sink, &tiles, force, &progress);

            log::info!("Finished in {:.1}s", start.elapsed().as_secs_f64());
            if !summary.failed.is_empty() {
                log::warn!(
                    "{} tile(s) failed and will be retried on the next run",
                    summary.failed.len()
                );
            }
        }
    }

    Ok(())
}
