//! Leaflet map documents.
//!
//! A [`LeafletMap`] is a centre, a zoom, a tile provider, and an ordered list
//! of [`Layer`]s. Rendering serializes the whole map to JSON and inlines it
//! next to a small script that turns each layer into Leaflet objects.

use quake_map_geography_models::LatLng;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::RenderError;
use crate::choropleth::Choropleth;
use crate::output::HtmlDocument;
use crate::script_safe_json;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const LEAFLET_HEAT_JS: &str = "https://unpkg.com/leaflet.heat@0.2.0/dist/leaflet-heat.js";

/// Basemap tile provider.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Tiles {
    /// `CARTO` Positron, a light grey basemap.
    #[default]
    CartoDbPositron,
    /// Standard `OpenStreetMap` tiles.
    OpenStreetMap,
}

impl Tiles {
    /// XYZ tile URL template.
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::CartoDbPositron => {
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
            }
            Self::OpenStreetMap => "https://tile.openstreetmap.org/{z}/{x}/{y}.png",
        }
    }

    /// Attribution shown in the map corner.
    #[must_use]
    pub const fn attribution(self) -> &'static str {
        match self {
            Self::CartoDbPositron => {
                "&copy; OpenStreetMap contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"
            }
            Self::OpenStreetMap => {
                "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors"
            }
        }
    }
}

/// One circle of a [`Layer::Circles`] group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircleMarker {
    /// Circle centre.
    pub center: LatLng,
    /// Radius in metres.
    pub radius: f64,
}

/// A drawable map layer.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Layer {
    /// A connected line through `locations`.
    PolyLine {
        /// Vertices in map order.
        locations: Vec<LatLng>,
        /// Stroke width in pixels.
        weight: u32,
        /// Stroke colour.
        color: String,
    },
    /// A `leaflet.heat` intensity layer over point locations.
    HeatMap {
        /// Heat points.
        points: Vec<LatLng>,
        /// Per-point blur radius in pixels.
        radius: u32,
    },
    /// Prefecture polygons filled by value.
    Choropleth(Box<Choropleth>),
    /// Filled, unstroked circles sized in metres.
    Circles {
        /// The circles to draw.
        circles: Vec<CircleMarker>,
        /// Fill colour.
        fill_color: String,
        /// Fill opacity.
        fill_opacity: f64,
    },
}

/// A Leaflet map ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct LeafletMap {
    title: String,
    center: LatLng,
    zoom: u8,
    tile_url: &'static str,
    tile_attribution: &'static str,
    layers: Vec<Layer>,
}

impl LeafletMap {
    /// Starts an empty map.
    #[must_use]
    pub fn new(title: impl Into<String>, center: LatLng, zoom: u8, tiles: Tiles) -> Self {
        Self {
            title: title.into(),
            center,
            zoom,
            tile_url: tiles.url(),
            tile_attribution: tiles.attribution(),
            layers: Vec::new(),
        }
    }

    /// Appends a layer; later layers draw on top.
    pub fn add_layer(&mut self, layer: Layer) -> &mut Self {
        self.layers.push(layer);
        self
    }

    /// Layers in draw order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Renders a complete HTML page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Json`] if the map data cannot be serialized.
    pub fn to_document(&self) -> Result<HtmlDocument, RenderError> {
        let map_data = script_safe_json(&serde_json::to_string(self)?);
        let title = crate::output::escape_html(&self.title);

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<link rel="stylesheet" href="{LEAFLET_CSS}">
<script src="{LEAFLET_JS}"></script>
<script src="{LEAFLET_HEAT_JS}"></script>
<style>
html, body, #map {{ width: 100%; height: 100%; margin: 0; padding: 0; }}
.legend {{ background: white; padding: 6px 8px; font: 12px sans-serif; line-height: 18px; }}
.legend i {{ width: 18px; height: 18px; float: left; margin-right: 6px; opacity: 0.8; }}
</style>
</head>
<body>
<div id="map"></div>
<script>
const mapData = {map_data};
{MAP_SCRIPT}
</script>
</body>
</html>
"#
        );

        Ok(HtmlDocument::new(self.title.clone(), html))
    }
}

const MAP_SCRIPT: &str = r#"const map = L.map('map').setView(mapData.center, mapData.zoom);
L.tileLayer(mapData.tile_url, { attribution: mapData.tile_attribution, maxZoom: 19 }).addTo(map);

function addLegend(legend) {
  const control = L.control({ position: 'bottomright' });
  control.onAdd = function () {
    const div = L.DomUtil.create('div', 'legend');
    let rows = '<b>' + legend.title + '</b><br>';
    for (let i = 0; i < legend.colors.length; i++) {
      const lo = legend.thresholds[i].toPrecision(4);
      const hi = legend.thresholds[i + 1].toPrecision(4);
      rows += '<i style="background:' + legend.colors[i] + '"></i>' + lo + ' &ndash; ' + hi + '<br>';
    }
    div.innerHTML = rows;
    return div;
  };
  control.addTo(map);
}

for (const layer of mapData.layers) {
  switch (layer.kind) {
    case 'poly_line':
      L.polyline(layer.locations, { weight: layer.weight, color: layer.color }).addTo(map);
      break;
    case 'heat_map':
      L.heatLayer(layer.points, { radius: layer.radius }).addTo(map);
      break;
    case 'choropleth':
      L.geoJSON(layer.data, {
        style: function (feature) {
          return {
            color: layer.line_color,
            weight: 1,
            fillColor: feature.properties.fill,
            fillOpacity: layer.fill_opacity,
          };
        },
        onEachFeature: function (feature, shape) {
          const tip = document.createElement('span');
          tip.textContent = feature.properties.name + ': ' + feature.properties.value;
          shape.bindTooltip(tip);
        },
      }).addTo(map);
      if (layer.legend) {
        addLegend(layer.legend);
      }
      break;
    case 'circles':
      for (const circle of layer.circles) {
        L.circle(circle.center, {
          radius: circle.radius,
          stroke: false,
          fill: true,
          fillColor: layer.fill_color,
          fillOpacity: layer.fill_opacity,
        }).addTo(map);
      }
      break;
  }
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LeafletMap {
        let mut map = LeafletMap::new("Sample", LatLng(36.0, 138.0), 7, Tiles::default());
        map.add_layer(Layer::PolyLine {
            locations: vec![LatLng(35.0, 139.0), LatLng(36.0, 140.0)],
            weight: 12,
            color: "mediumvioletred".to_string(),
        })
        .add_layer(Layer::HeatMap {
            points: vec![LatLng(38.3, 142.4)],
            radius: 30,
        });
        map
    }

    #[test]
    fn serializes_layers_in_order_with_kind_tags() {
        let value = serde_json::to_value(sample()).unwrap();
        let layers = value["layers"].as_array().unwrap();

        assert_eq!(layers.len(), 2);
        assert_eq!(layers[0]["kind"], "poly_line");
        assert_eq!(layers[0]["locations"][0], serde_json::json!([35.0, 139.0]));
        assert_eq!(layers[1]["kind"], "heat_map");
        assert_eq!(value["center"], serde_json::json!([36.0, 138.0]));
        assert_eq!(value["zoom"], 7);
    }

    #[test]
    fn document_is_standalone_leaflet_page() {
        let doc = sample().to_document().unwrap();
        let html = doc.html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(LEAFLET_JS));
        assert!(html.contains(LEAFLET_HEAT_JS));
        assert!(html.contains("basemaps.cartocdn.com"));
        assert!(html.contains("\"kind\":\"poly_line\""));
        assert!(html.contains("<title>Sample</title>"));
    }

    #[test]
    fn choropleth_tooltips_are_plain_text() {
        let html = sample().to_document().unwrap().html().to_string();

        assert!(html.contains("tip.textContent = feature.properties.name"));
        assert!(html.contains("shape.bindTooltip(tip);"));
        assert!(!html.contains("bindTooltip(feature.properties.name"));
    }

    #[test]
    fn tiles_parse_from_config_names() {
        assert_eq!("cartodbpositron".parse::<Tiles>().unwrap(), Tiles::CartoDbPositron);
        assert_eq!("openstreetmap".parse::<Tiles>().unwrap(), Tiles::OpenStreetMap);
        assert_eq!(Tiles::CartoDbPositron.to_string(), "cartodbpositron");
    }
}
