//! Loader, normalizer, joiner and renderer chained into one run.
//!
//! Each stage advances a four-step progress bar. Any failure aborts the run;
//! nothing is retried.

use std::path::{Path, PathBuf};
use std::time::Instant;

use quake_map_cli_utils::ProgressCallback;
use quake_map_geography::region::map_center;
use quake_map_geography::stats::{compute_areas, join};
use quake_map_geography::{GeoError, PrefectureRegion, load, normalize};
use quake_map_geography_models::{
    EarthquakeRecord, LatLng, PlateBoundary, PopulationRecord, PrefectureStatsTable, RawBoundary,
};
use quake_map_render::{Artifact, MapInputs, RenderError, WrittenArtifact, open_in_viewer};
use thiserror::Error;

use crate::config::PipelineConfig;

/// Number of progress steps in a full run.
pub const STEPS: u64 = 4;

/// Errors that abort a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// The prefecture file held no polygons to centre the maps on.
    #[error("No prefecture polygons in {path}")]
    NoRegions { path: String },
}

/// Everything read from disk, before any derivation.
#[derive(Debug)]
pub struct RawInputs {
    pub boundaries: Vec<RawBoundary>,
    pub earthquakes: Vec<EarthquakeRecord>,
    pub regions: Vec<PrefectureRegion>,
    pub population: Vec<PopulationRecord>,
}

/// Normalized and joined data, ready to render.
#[derive(Debug)]
pub struct Prepared {
    pub boundaries: Vec<PlateBoundary>,
    pub earthquakes: Vec<EarthquakeRecord>,
    pub regions: Vec<PrefectureRegion>,
    pub stats: PrefectureStatsTable,
    pub center: LatLng,
}

impl Prepared {
    #[must_use]
    pub fn inputs(&self) -> MapInputs<'_> {
        MapInputs {
            boundaries: &self.boundaries,
            earthquakes: &self.earthquakes,
            regions: &self.regions,
            stats: &self.stats,
            center: self.center,
        }
    }
}

/// Reads the four input files.
///
/// # Errors
///
/// Returns the first loader error, naming the offending file.
pub fn load_inputs(config: &PipelineConfig) -> Result<RawInputs, GeoError> {
    let paths = &config.inputs;

    let boundaries = load::read_plate_boundaries(&paths.plate_boundaries)?;
    let earthquakes = load::read_earthquakes(&paths.earthquakes)?;
    let regions = load::read_prefectures(&paths.prefectures)?;
    let population = load::read_population(&paths.population)?;

    log::info!(
        "Loaded {} boundary segments, {} earthquakes, {} prefectures, {} population rows",
        boundaries.len(),
        earthquakes.len(),
        regions.len(),
        population.len()
    );

    Ok(RawInputs {
        boundaries,
        earthquakes,
        regions,
        population,
    })
}

/// Runs the loader, normalizer and joiner, advancing `progress` once per
/// stage.
///
/// # Errors
///
/// * If any input file cannot be loaded
/// * If the join fails under [`quake_map_geography_models::JoinPolicy::Fail`]
/// * If there are no prefecture polygons
pub fn prepare(
    config: &PipelineConfig,
    progress: &dyn ProgressCallback,
) -> Result<Prepared, PipelineError> {
    progress.set_message("Loading inputs".to_string());
    let raw = load_inputs(config)?;
    progress.inc(1);

    progress.set_message("Normalizing plate boundaries".to_string());
    let boundaries = normalize::normalize_boundaries(&raw.boundaries);
    progress.inc(1);

    progress.set_message("Joining population and area".to_string());
    let areas = compute_areas(&raw.regions, &config.projection);
    let stats = join(&raw.population, &areas, config.join_policy)?;
    let center = map_center(&raw.regions).ok_or_else(|| PipelineError::NoRegions {
        path: config.inputs.prefectures.display().to_string(),
    })?;
    progress.inc(1);

    Ok(Prepared {
        boundaries,
        earthquakes: raw.earthquakes,
        regions: raw.regions,
        stats,
        center,
    })
}

/// Renders `artifacts` into the configured output directory.
///
/// # Errors
///
/// Returns the first render or write failure.
pub fn render_artifacts(
    config: &PipelineConfig,
    prepared: &Prepared,
    artifacts: &[Artifact],
    progress: &dyn ProgressCallback,
) -> Result<Vec<WrittenArtifact>, PipelineError> {
    progress.set_message("Rendering".to_string());

    let inputs = prepared.inputs();
    let written = artifacts
        .iter()
        .map(|artifact| {
            quake_map_render::render(*artifact, &inputs, config.style, &config.output_dir)
        })
        .collect::<Result<Vec<_>, _>>()?;

    progress.inc(1);
    Ok(written)
}

/// Full run: prepare, render `artifacts`, and optionally open each
/// standalone page.
///
/// # Errors
///
/// Returns the first stage failure. Viewer failures are logged only.
pub fn run(
    config: &PipelineConfig,
    artifacts: &[Artifact],
    open: bool,
    progress: &dyn ProgressCallback,
) -> Result<Vec<PathBuf>, PipelineError> {
    let start = Instant::now();
    progress.set_total(STEPS);

    let prepared = prepare(config, progress)?;
    let written = render_artifacts(config, &prepared, artifacts, progress)?;

    let standalone: Vec<PathBuf> = written.into_iter().map(|w| w.standalone).collect();

    if open {
        let opened = open_all(&standalone, open_in_viewer);
        log::debug!("Opened {opened} of {} pages", standalone.len());
    }

    let elapsed = start.elapsed();
    progress.finish(format!(
        "Rendered {} artifacts in {:.1}s",
        standalone.len(),
        elapsed.as_secs_f64()
    ));

    Ok(standalone)
}

/// Hands each page to `opener`. A failure is logged and the rest are still
/// tried. Returns how many pages opened.
fn open_all(paths: &[PathBuf], opener: impl Fn(&Path) -> Result<(), RenderError>) -> usize {
    paths
        .iter()
        .filter(|path| match opener(path) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not open {}: {e}", path.display());
                false
            }
        })
        .count()
}
