#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plate boundary, earthquake, and prefecture statistics types.
//!
//! These are the plain values that flow through the map pipeline: raw and
//! normalized plate boundaries, historical earthquake rows, population rows,
//! and the joined per-prefecture statistics table that drives the
//! choropleths and the density chart.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A coordinate pair in storage order: `(longitude, latitude)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat(pub f64, pub f64);

impl LonLat {
    /// Longitude in degrees.
    #[must_use]
    pub const fn lon(self) -> f64 {
        self.0
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.1
    }

    /// Returns the same point in map order.
    #[must_use]
    pub const fn swapped(self) -> LatLng {
        LatLng(self.1, self.0)
    }
}

/// A coordinate pair in map order: `(latitude, longitude)`.
///
/// Serializes as a two-element array, which is what Leaflet expects for
/// polyline and circle locations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng(pub f64, pub f64);

impl LatLng {
    /// Latitude in degrees.
    #[must_use]
    pub const fn lat(self) -> f64 {
        self.0
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn lng(self) -> f64 {
        self.1
    }
}

/// One plate boundary segment exactly as read from the shapefile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBoundary {
    /// Points in storage order, `(longitude, latitude)`.
    pub points: Vec<LonLat>,
}

/// One plate boundary segment ready for drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateBoundary {
    /// Points in map order, `(latitude, longitude)`.
    pub points: Vec<LatLng>,
}

/// A historical earthquake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthquakeRecord {
    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,
    /// Epicentre latitude.
    pub latitude: f64,
    /// Epicentre longitude.
    pub longitude: f64,
    /// Reported magnitude.
    pub magnitude: f64,
}

impl EarthquakeRecord {
    /// Epicentre in map order.
    #[must_use]
    pub const fn location(&self) -> LatLng {
        LatLng(self.latitude, self.longitude)
    }
}

/// One row of the population table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRecord {
    /// Prefecture name, the join key.
    pub prefecture: String,
    /// Resident population.
    pub population: u64,
}

/// How the statistics join treats population rows with no matching area.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JoinPolicy {
    /// Keep the row with no area, density, or log density.
    #[default]
    Fill,
    /// Remove the row from the output.
    Drop,
    /// Abort the join.
    Fail,
}

/// Joined statistics for a single prefecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefectureStats {
    /// Prefecture name.
    pub name: String,
    /// Resident population.
    pub population: u64,
    /// Land area in square kilometers, measured in a projected CRS.
    pub area_sqkm: Option<f64>,
    /// Residents per square kilometer.
    pub density: Option<f64>,
    /// Natural logarithm of [`Self::density`].
    ///
    /// The name is kept for compatibility with the published column even
    /// though the value is `ln`, not `log10`.
    pub log10_density: Option<f64>,
}

impl PrefectureStats {
    /// Derives density and log density from population and area.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(name: impl Into<String>, population: u64, area_sqkm: Option<f64>) -> Self {
        let density = area_sqkm.map(|area| population as f64 / area);
        let log10_density = density.map(f64::ln);

        Self {
            name: name.into(),
            population,
            area_sqkm,
            density,
            log10_density,
        }
    }
}

/// Per-prefecture statistics in population-table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrefectureStatsTable {
    rows: Vec<PrefectureStats>,
}

impl PrefectureStatsTable {
    /// Wraps already-joined rows.
    #[must_use]
    pub const fn new(rows: Vec<PrefectureStats>) -> Self {
        Self { rows }
    }

    /// All rows, in insertion order.
    #[must_use]
    pub fn rows(&self) -> &[PrefectureStats] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks up a row by prefecture name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PrefectureStats> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Rows sorted ascending by density.
    ///
    /// The sort is stable. Rows without a density go last.
    #[must_use]
    pub fn sorted_by_density(&self) -> Vec<&PrefectureStats> {
        let mut rows: Vec<&PrefectureStats> = self.rows.iter().collect();
        rows.sort_by(|a, b| cmp_missing_last(a.density, b.density));
        rows
    }

    /// The `n` most populous prefectures, largest first.
    #[must_use]
    pub fn top_by_population(&self, n: usize) -> Vec<&PrefectureStats> {
        let mut rows: Vec<&PrefectureStats> = self.rows.iter().collect();
        rows.sort_by(|a, b| b.population.cmp(&a.population));
        rows.truncate(n);
        rows
    }

    /// The `n` most densely populated prefectures, densest first.
    #[must_use]
    pub fn top_by_density(&self, n: usize) -> Vec<&PrefectureStats> {
        let mut rows: Vec<&PrefectureStats> = self
            .rows
            .iter()
            .filter(|row| row.density.is_some_and(|d| !d.is_nan()))
            .collect();
        rows.sort_by(|a, b| cmp_missing_last(b.density, a.density));
        rows.truncate(n);
        rows
    }
}

/// Orders optional floats ascending with `None` and NaN after every number.
fn cmp_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    let a = a.filter(|v| !v.is_nan());
    let b = b.filter(|v| !v.is_nan());
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
