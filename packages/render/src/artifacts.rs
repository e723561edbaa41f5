//! The four pipeline artifacts and how each is assembled.

use std::path::Path;

use quake_map_geography::PrefectureRegion;
use quake_map_geography_models::{
    EarthquakeRecord, LatLng, PlateBoundary, PrefectureStatsTable,
};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::RenderError;
use crate::chart::DensityChart;
use crate::choropleth::{Choropleth, StatColumn};
use crate::map::{CircleMarker, Layer, LeafletMap, Tiles};
use crate::output::{HtmlDocument, WrittenArtifact, write_artifact};

const BOUNDARY_WEIGHT: u32 = 12;
const BOUNDARY_COLOR: &str = "mediumvioletred";
const HEAT_RADIUS: u32 = 30;
const CIRCLE_FILL: &str = "coral";
const CIRCLE_OPACITY: f64 = 0.5;

/// One renderable output.
#[derive(
    Debug,
    Clone,
    Copy,
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
pub enum Artifact {
    /// Plate boundaries over an earthquake heat layer.
    Overview,
    /// Population and density bars.
    Chart,
    /// Prefectures filled by density.
    Choropleth,
    /// Plate boundaries, log-density choropleth and magnitude circles.
    Combined,
}

impl Artifact {
    pub const ALL: [Self; 4] = [Self::Overview, Self::Chart, Self::Choropleth, Self::Combined];

    /// Output file stem.
    #[must_use]
    pub const fn stem(self) -> &'static str {
        match self {
            Self::Overview => "m_1",
            Self::Chart => "p_1",
            Self::Choropleth => "m_2",
            Self::Combined => "m_3",
        }
    }

    /// Human readable label for menus.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overview => "Overview map (plate boundaries + quake heat)",
            Self::Chart => "Population / density chart",
            Self::Choropleth => "Density choropleth",
            Self::Combined => "Combined map (log density + magnitudes)",
        }
    }
}

/// Everything the renderer reads.
#[derive(Debug, Clone, Copy)]
pub struct MapInputs<'a> {
    pub boundaries: &'a [PlateBoundary],
    pub earthquakes: &'a [EarthquakeRecord],
    pub regions: &'a [PrefectureRegion],
    pub stats: &'a PrefectureStatsTable,
    pub center: LatLng,
}

/// Basemap settings shared by every map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapStyle {
    pub tiles: Tiles,
    pub zoom: u8,
}

impl Default for MapStyle {
    fn default() -> Self {
        Self {
            tiles: Tiles::default(),
            zoom: 7,
        }
    }
}

/// Circle radius in metres for a magnitude.
#[must_use]
pub fn bubble_radius(magnitude: f64) -> f64 {
    4.0_f64.powf(magnitude)
}

fn boundary_layers(boundaries: &[PlateBoundary]) -> impl Iterator<Item = Layer> + '_ {
    boundaries.iter().map(|boundary| Layer::PolyLine {
        locations: boundary.points.clone(),
        weight: BOUNDARY_WEIGHT,
        color: BOUNDARY_COLOR.to_string(),
    })
}

/// Plate boundaries over a heat layer of every epicentre.
#[must_use]
pub fn overview_map(inputs: &MapInputs<'_>, style: MapStyle) -> LeafletMap {
    let mut map = LeafletMap::new(
        "Earthquakes and plate boundaries",
        inputs.center,
        style.zoom,
        style.tiles,
    );
    for layer in boundary_layers(inputs.boundaries) {
        map.add_layer(layer);
    }
    map.add_layer(Layer::HeatMap {
        points: inputs
            .earthquakes
            .iter()
            .map(EarthquakeRecord::location)
            .collect(),
        radius: HEAT_RADIUS,
    });
    map
}

#[must_use]
pub fn density_chart(inputs: &MapInputs<'_>) -> DensityChart {
    DensityChart::new(inputs.stats)
}

/// Prefectures filled by density.
#[must_use]
pub fn choropleth_map(inputs: &MapInputs<'_>, style: MapStyle) -> LeafletMap {
    let mut map = LeafletMap::new(
        "Population density by prefecture",
        inputs.center,
        style.zoom,
        style.tiles,
    );
    map.add_layer(Layer::Choropleth(Box::new(Choropleth::new(
        inputs.regions,
        inputs.stats,
        StatColumn::Density,
    ))));
    map
}

/// Plate boundaries, a log-density choropleth, and one circle per quake
/// sized by magnitude.
#[must_use]
pub fn combined_map(inputs: &MapInputs<'_>, style: MapStyle) -> LeafletMap {
    let mut map = LeafletMap::new(
        "Earthquakes, plate boundaries and population density",
        inputs.center,
        style.zoom,
        style.tiles,
    );
    for layer in boundary_layers(inputs.boundaries) {
        map.add_layer(layer);
    }
    map.add_layer(Layer::Choropleth(Box::new(Choropleth::new(
        inputs.regions,
        inputs.stats,
        StatColumn::Log10Density,
    ))));
    map.add_layer(Layer::Circles {
        circles: inputs
            .earthquakes
            .iter()
            .map(|quake| CircleMarker {
                center: quake.location(),
                radius: bubble_radius(quake.magnitude),
            })
            .collect(),
        fill_color: CIRCLE_FILL.to_string(),
        fill_opacity: CIRCLE_OPACITY,
    });
    map
}

/// Builds the document for one artifact.
///
/// # Errors
///
/// Returns [`RenderError::Json`] if the layer or figure data cannot be
/// serialized.
pub fn document(
    artifact: Artifact,
    inputs: &MapInputs<'_>,
    style: MapStyle,
) -> Result<HtmlDocument, RenderError> {
    match artifact {
        Artifact::Overview => overview_map(inputs, style).to_document(),
        Artifact::Chart => density_chart(inputs).to_document(),
        Artifact::Choropleth => choropleth_map(inputs, style).to_document(),
        Artifact::Combined => combined_map(inputs, style).to_document(),
    }
}

/// Renders `artifact` and writes both of its files into `output_dir`.
///
/// # Errors
///
/// * If the document cannot be serialized
/// * If either output file cannot be written
pub fn render(
    artifact: Artifact,
    inputs: &MapInputs<'_>,
    style: MapStyle,
    output_dir: &Path,
) -> Result<WrittenArtifact, RenderError> {
    log::debug!("Rendering {artifact} as {}", artifact.stem());
    let doc = document(artifact, inputs, style)?;
    write_artifact(output_dir, artifact.stem(), &doc)
}
