#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Japan earthquake and prefecture map generator.
//!
//! Loads tectonic plate boundaries, the 1970-2014 earthquake catalogue,
//! prefecture polygons and prefecture populations, then writes Leaflet maps
//! and a Plotly chart as HTML. Run without a subcommand for an interactive
//! menu.
//!
//! Uses `indicatif-log-bridge` (via [`quake_map_cli_utils::init_logger`])
//! so log lines and the progress bar never fight for the terminal.

mod config;
mod pipeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dialoguer::{Confirm, Select};
use quake_map_cli_utils::{IndicatifProgress, MultiProgress};
use quake_map_geography_models::{JoinPolicy, PrefectureStats, PrefectureStatsTable};
use quake_map_render::{Artifact, Tiles};

use crate::config::{CliOverrides, PipelineConfig};

const TOP_N: usize = 5;

#[derive(Parser)]
#[command(name = "quake_map", about = "Japan earthquake and prefecture maps")]
struct Cli {
    #[command(flatten)]
    flags: ConfigFlags,

    /// Open each standalone page in the system viewer when done
    #[arg(long, global = true)]
    open: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct ConfigFlags {
    /// TOML config file (default: `<base-dir>/quake_map.toml` if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory that relative data and output paths resolve against
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Directory holding the four input files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory the HTML artifacts are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Basemap tiles (`cartodbpositron` or `openstreetmap`)
    #[arg(long, global = true)]
    tiles: Option<Tiles>,

    /// Initial map zoom
    #[arg(long, global = true)]
    zoom: Option<u8>,

    /// What to do with population rows that have no boundary (`fill`,
    /// `drop` or `fail`)
    #[arg(long, global = true)]
    join_policy: Option<JoinPolicy>,

    /// UTM zone (north) used to measure areas
    #[arg(long, global = true)]
    utm_zone: Option<u8>,

    /// WGS84 UTM EPSG code used to measure areas; overrides `--utm-zone`
    #[arg(long, global = true)]
    area_epsg: Option<u32>,
}

impl From<ConfigFlags> for CliOverrides {
    fn from(flags: ConfigFlags) -> Self {
        Self {
            config: flags.config,
            base_dir: flags.base_dir,
            data_dir: flags.data_dir,
            output_dir: flags.output_dir,
            tiles: flags.tiles,
            zoom: flags.zoom,
            join_policy: flags.join_policy,
            utm_zone: flags.utm_zone,
            area_epsg: flags.area_epsg,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and render every artifact
    Run,
    /// Print the joined prefecture table and the top prefectures
    Stats,
    /// Render a single artifact
    Render {
        /// `overview`, `chart`, `choropleth` or `combined`
        artifact: Artifact,
    },
}

/// Interactive menu entries.
enum Tool {
    RunAll,
    RenderOne,
    Stats,
}

impl Tool {
    const ALL: &[Self] = &[Self::RunAll, Self::RenderOne, Self::Stats];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::RunAll => "Render all maps and the chart",
            Self::RenderOne => "Render one artifact",
            Self::Stats => "Show prefecture statistics",
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = quake_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig::load(&cli.flags.into())?;
    log::debug!("Resolved configuration: {config:?}");

    match cli.command {
        Some(Commands::Run) => render(&multi, &config, &Artifact::ALL, cli.open)?,
        Some(Commands::Render { artifact }) => render(&multi, &config, &[artifact], cli.open)?,
        Some(Commands::Stats) => stats(&multi, &config)?,
        None => interactive(&multi, &config, cli.open)?,
    }

    Ok(())
}

fn render(
    multi: &MultiProgress,
    config: &PipelineConfig,
    artifacts: &[Artifact],
    open: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::steps_bar(multi, "Pipeline", pipeline::STEPS);
    let written = pipeline::run(config, artifacts, open, progress.as_ref())?;

    for path in written {
        println!("{}", path.display());
    }

    Ok(())
}

fn stats(multi: &MultiProgress, config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::steps_bar(multi, "Pipeline", pipeline::STEPS - 1);
    let prepared = pipeline::prepare(config, progress.as_ref())?;
    progress.finish(format!("Joined {} prefectures", prepared.stats.len()));

    print_stats(&prepared.stats);
    Ok(())
}

fn interactive(
    multi: &MultiProgress,
    config: &PipelineConfig,
    open: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Japan Earthquake Maps");
    println!();

    let labels: Vec<&str> = Tool::ALL.iter().map(Tool::label).collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    match Tool::ALL[idx] {
        Tool::RunAll => {
            let open = open || confirm_open()?;
            render(multi, config, &Artifact::ALL, open)
        }
        Tool::RenderOne => {
            let labels: Vec<&str> = Artifact::ALL.iter().map(|a| a.label()).collect();
            let idx = Select::new()
                .with_prompt("Which artifact?")
                .items(&labels)
                .default(0)
                .interact()?;
            let open = open || confirm_open()?;
            render(multi, config, &[Artifact::ALL[idx]], open)
        }
        Tool::Stats => stats(multi, config),
    }
}

fn confirm_open() -> Result<bool, dialoguer::Error> {
    Confirm::new()
        .with_prompt("Open the results in a browser?")
        .default(false)
        .interact()
}

fn print_stats(stats: &PrefectureStatsTable) {
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>14}",
        "prefecture", "population", "area_sqkm", "density", "log10_density"
    );
    for row in stats.rows() {
        print_row(row);
    }

    println!();
    println!("Top {TOP_N} by population:");
    for row in stats.top_by_population(TOP_N) {
        println!("  {:<12} {:>12}", row.name, row.population);
    }

    println!();
    println!("Top {TOP_N} by density:");
    for row in stats.top_by_density(TOP_N) {
        println!("  {:<12} {:>12}", row.name, format_value(row.density));
    }
}

fn print_row(row: &PrefectureStats) {
    println!(
        "{:<12} {:>12} {:>12} {:>12} {:>14}",
        row.name,
        row.population,
        format_value(row.area_sqkm),
        format_value(row.density),
        format_value(row.log10_density),
    );
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_render_subcommand_with_global_flags() {
        let cli = Cli::try_parse_from([
            "quake_map",
            "render",
            "combined",
            "--zoom",
            "6",
            "--join-policy",
            "drop",
            "--tiles",
            "openstreetmap",
            "--open",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Some(Commands::Render {
                artifact: Artifact::Combined
            })
        ));
        assert!(cli.open);

        let overrides = CliOverrides::from(cli.flags);
        assert_eq!(overrides.zoom, Some(6));
        assert_eq!(overrides.join_policy, Some(JoinPolicy::Drop));
        assert_eq!(overrides.tiles, Some(Tiles::OpenStreetMap));
    }

    #[test]
    fn no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["quake_map"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn unknown_artifact_is_rejected() {
        assert!(Cli::try_parse_from(["quake_map", "render", "m_9"]).is_err());
    }

    #[test]
    fn missing_values_print_as_dash() {
        assert_eq!(format_value(None), "-");
        assert_eq!(format_value(Some(1_234.567)), "1234.57");
    }
}
