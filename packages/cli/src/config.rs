//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is resolved once at startup from four layers, each
//! overriding the one before it: built-in defaults, an optional
//! `quake_map.toml`, `QUAKE_MAP_*` environment variables, and command-line
//! flags.

use std::path::{Path, PathBuf};

use quake_map_geography::projection::{Hemisphere, UtmProjection};
use quake_map_geography_models::JoinPolicy;
use quake_map_render::{MapStyle, Tiles};
use serde::Deserialize;
use thiserror::Error;

/// Config file looked up in the base directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "quake_map.toml";

pub const BASE_DIR_ENV: &str = "QUAKE_MAP_BASE_DIR";
pub const DATA_DIR_ENV: &str = "QUAKE_MAP_DATA_DIR";
pub const OUTPUT_DIR_ENV: &str = "QUAKE_MAP_OUTPUT_DIR";

const DEFAULT_OUTPUT_DIR: &str = "html";
const DEFAULT_PLATE_BOUNDARIES: &str = "Plate_Boundaries/Plate_Boundaries/Plate_Boundaries.shp";
const DEFAULT_EARTHQUAKES: &str = "earthquakes1970-2014.csv";
const DEFAULT_PREFECTURES: &str =
    "japan-prefecture-boundaries/japan-prefecture-boundaries/japan-prefecture-boundaries.shp";
const DEFAULT_POPULATION: &str = "japan-prefecture-population.csv";
const MAX_ZOOM: u8 = 19;

/// Errors raised while resolving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`ConfigFile`].
    #[error("Invalid config {path}: {source}")]
    Toml {
        /// Config file path.
        path: String,
        /// Parse error.
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("Invalid configuration: {message}")]
    Invalid {
        /// What was wrong.
        message: String,
    },
}

/// Contents of `quake_map.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub base_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub inputs: InputOverrides,
    pub tiles: Option<Tiles>,
    pub zoom: Option<u8>,
    pub join_policy: Option<JoinPolicy>,
    pub utm_zone: Option<u8>,
    pub area_epsg: Option<u32>,
}

/// Input file paths, relative to the data directory unless absolute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputOverrides {
    pub plate_boundaries: Option<PathBuf>,
    pub earthquakes: Option<PathBuf>,
    pub prefectures: Option<PathBuf>,
    pub population: Option<PathBuf>,
}

/// Values taken from command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub base_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub tiles: Option<Tiles>,
    pub zoom: Option<u8>,
    pub join_policy: Option<JoinPolicy>,
    pub utm_zone: Option<u8>,
    pub area_epsg: Option<u32>,
}

/// Resolved input file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPaths {
    pub plate_boundaries: PathBuf,
    pub earthquakes: PathBuf,
    pub prefectures: PathBuf,
    pub population: PathBuf,
}

/// Fully resolved settings for one pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub base_dir: PathBuf,
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub inputs: InputPaths,
    pub style: MapStyle,
    pub join_policy: JoinPolicy,
    pub projection: UtmProjection,
}

impl PipelineConfig {
    /// Resolves configuration from the process environment.
    ///
    /// # Errors
    ///
    /// * If an explicit or discovered config file cannot be read or parsed
    /// * If the zoom level or UTM zone is out of range
    pub fn load(cli: &CliOverrides) -> Result<Self, ConfigError> {
        Self::resolve(cli, |key| std::env::var_os(key).map(PathBuf::from))
    }

    /// Resolves configuration with `env` standing in for the environment.
    ///
    /// # Errors
    ///
    /// * If an explicit or discovered config file cannot be read or parsed
    /// * If the zoom level or UTM zone is out of range
    pub fn resolve(
        cli: &CliOverrides,
        env: impl Fn(&str) -> Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let env_base = env(BASE_DIR_ENV);

        let search_base = cli
            .base_dir
            .clone()
            .or_else(|| env_base.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        let file = match &cli.config {
            Some(path) => read_config_file(path)?,
            None => {
                let path = search_base.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    read_config_file(&path)?
                } else {
                    ConfigFile::default()
                }
            }
        };

        let base_dir = cli
            .base_dir
            .clone()
            .or(env_base)
            .or(file.base_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let data_dir = cli
            .data_dir
            .clone()
            .or_else(|| env(DATA_DIR_ENV))
            .or(file.data_dir)
            .map_or_else(|| base_dir.clone(), |dir| base_dir.join(dir));

        let output_dir = base_dir.join(
            cli.output_dir
                .clone()
                .or_else(|| env(OUTPUT_DIR_ENV))
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        );

        let input = |value: Option<PathBuf>, default: &str| {
            data_dir.join(value.unwrap_or_else(|| PathBuf::from(default)))
        };
        let inputs = InputPaths {
            plate_boundaries: input(file.inputs.plate_boundaries, DEFAULT_PLATE_BOUNDARIES),
            earthquakes: input(file.inputs.earthquakes, DEFAULT_EARTHQUAKES),
            prefectures: input(file.inputs.prefectures, DEFAULT_PREFECTURES),
            population: input(file.inputs.population, DEFAULT_POPULATION),
        };

        let zoom = cli.zoom.or(file.zoom).unwrap_or(MapStyle::default().zoom);
        if zoom > MAX_ZOOM {
            return Err(ConfigError::Invalid {
                message: format!("zoom {zoom} is above the maximum of {MAX_ZOOM}"),
            });
        }

        let projection = match (cli.area_epsg.or(file.area_epsg), cli.utm_zone.or(file.utm_zone)) {
            (Some(code), _) => {
                UtmProjection::from_epsg(code).ok_or_else(|| ConfigError::Invalid {
                    message: format!("EPSG:{code} is not a WGS84 UTM zone"),
                })?
            }
            (None, Some(zone)) => UtmProjection::new(zone, Hemisphere::North).ok_or_else(|| {
                ConfigError::Invalid {
                    message: format!("UTM zone {zone} is not in 1..=60"),
                }
            })?,
            (None, None) => UtmProjection::JAPAN,
        };

        Ok(Self {
            base_dir,
            data_dir,
            output_dir,
            inputs,
            style: MapStyle {
                tiles: cli.tiles.or(file.tiles).unwrap_or_default(),
                zoom,
            },
            join_policy: cli.join_policy.or(file.join_policy).unwrap_or_default(),
            projection,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    log::debug!("Reading config from {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: path.display().to_string(),
        source,
    })
}
