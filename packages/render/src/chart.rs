//! Population and density bar chart.

use quake_map_geography_models::PrefectureStatsTable;
use serde::Serialize;
use serde_json::{Value, json};

use crate::RenderError;
use crate::output::{HtmlDocument, escape_html};
use crate::script_safe_json;

const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

pub const POPULATION_TITLE: &str = "Populations in Japanese Prefectures";
pub const DENSITY_TITLE: &str = "Densities in Japanese Prefectures";

const POPULATION_COLOR: &str = "teal";
const DENSITY_COLOR: &str = "coral";
const HORIZONTAL_SPACING: f64 = 0.05;
const HEIGHT: u32 = 2048;
const WIDTH: u32 = 1024;
const FONT_SIZE: u32 = 20;

#[derive(Debug, Clone, Serialize)]
struct BarTrace {
    #[serde(rename = "type")]
    kind: &'static str,
    orientation: &'static str,
    name: &'static str,
    x: Vec<Option<f64>>,
    y: Vec<String>,
    xaxis: &'static str,
    yaxis: &'static str,
    marker: Value,
}

/// A two-panel horizontal bar figure in Plotly's JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct DensityChart {
    data: Vec<BarTrace>,
    layout: Value,
}

impl DensityChart {
    /// Builds both panels with rows sorted ascending by density. Rows with no
    /// density sort last and show an empty density bar.
    #[must_use]
    pub fn new(stats: &PrefectureStatsTable) -> Self {
        let rows = stats.sorted_by_density();
        let names: Vec<String> = rows.iter().map(|row| row.name.clone()).collect();

        #[allow(clippy::cast_precision_loss)]
        let population: Vec<Option<f64>> = rows
            .iter()
            .map(|row| Some(row.population as f64))
            .collect();
        let density: Vec<Option<f64>> = rows.iter().map(|row| row.density).collect();

        let left_end = (1.0 - HORIZONTAL_SPACING) / 2.0;
        let right_start = left_end + HORIZONTAL_SPACING;

        let data = vec![
            BarTrace {
                kind: "bar",
                orientation: "h",
                name: "population",
                x: population,
                y: names.clone(),
                xaxis: "x",
                yaxis: "y",
                marker: json!({ "color": POPULATION_COLOR }),
            },
            BarTrace {
                kind: "bar",
                orientation: "h",
                name: "density",
                x: density,
                y: names,
                xaxis: "x2",
                yaxis: "y2",
                marker: json!({ "color": DENSITY_COLOR }),
            },
        ];

        let layout = json!({
            "height": HEIGHT,
            "width": WIDTH,
            "font": { "size": FONT_SIZE },
            "showlegend": false,
            "xaxis": { "domain": [0.0, left_end], "anchor": "y" },
            "yaxis": { "anchor": "x" },
            "xaxis2": { "domain": [right_start, 1.0], "anchor": "y2" },
            "yaxis2": { "anchor": "x2" },
            "annotations": [
                subplot_title(POPULATION_TITLE, left_end / 2.0),
                subplot_title(DENSITY_TITLE, f64::midpoint(right_start, 1.0)),
            ],
        });

        Self { data, layout }
    }

    /// Prefecture names in trace order.
    #[must_use]
    pub fn categories(&self) -> &[String] {
        self.data
            .first()
            .map(|trace| trace.y.as_slice())
            .unwrap_or_default()
    }

    /// Renders a standalone Plotly page.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Json`] if the figure cannot be serialized.
    pub fn to_document(&self) -> Result<HtmlDocument, RenderError> {
        let figure = script_safe_json(&serde_json::to_string(self)?);
        let title = escape_html(DENSITY_TITLE);

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<script src="{PLOTLY_JS}"></script>
</head>
<body>
<div id="chart"></div>
<script>
const figure = {figure};
Plotly.newPlot('chart', figure.data, figure.layout);
</script>
</body>
</html>
"#
        );

        Ok(HtmlDocument::new(DENSITY_TITLE.to_string(), html))
    }
}

fn subplot_title(text: &str, x: f64) -> Value {
    json!({
        "text": text,
        "x": x,
        "y": 1.0,
        "xref": "paper",
        "yref": "paper",
        "xanchor": "center",
        "yanchor": "bottom",
        "showarrow": false,
    })
}

#[cfg(test)]
mod tests {
    use quake_map_geography_models::PrefectureStats;

    use super::*;

    fn stats() -> PrefectureStatsTable {
        PrefectureStatsTable::new(vec![
            PrefectureStats::new("Tokyo", 13_000_000, Some(2_000.0)),
            PrefectureStats::new("Hokkaido", 5_000_000, Some(80_000.0)),
            PrefectureStats::new("Unmapped", 10, None),
            PrefectureStats::new("Osaka", 8_800_000, Some(1_900.0)),
        ])
    }

    #[test]
    fn both_panels_share_density_order() {
        let chart = DensityChart::new(&stats());
        let value = serde_json::to_value(&chart).unwrap();

        assert_eq!(
            chart.categories(),
            ["Hokkaido", "Osaka", "Tokyo", "Unmapped"]
        );
        assert_eq!(value["data"][0]["y"], value["data"][1]["y"]);
        assert_eq!(value["data"][0]["x"][0], 5_000_000.0);
        assert_eq!(value["data"][1]["x"][3], Value::Null);
    }

    #[test]
    fn populations_follow_independent_sort() {
        let table = stats();
        let chart = DensityChart::new(&table);
        let value = serde_json::to_value(&chart).unwrap();

        let mut copy: Vec<PrefectureStats> = table.rows().to_vec();
        copy.sort_by(|a, b| match (a.density, b.density) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        #[allow(clippy::cast_precision_loss)]
        let expected: Vec<Value> = copy
            .iter()
            .map(|row| json!(row.population as f64))
            .collect();
        assert_eq!(value["data"][0]["x"].as_array().unwrap(), &expected);
    }

    #[test]
    fn layout_matches_figure_settings() {
        let value = serde_json::to_value(DensityChart::new(&stats())).unwrap();
        let layout = &value["layout"];

        assert_eq!(layout["height"], 2048);
        assert_eq!(layout["width"], 1024);
        assert_eq!(layout["font"]["size"], 20);
        assert_eq!(layout["showlegend"], false);
        assert_eq!(value["data"][0]["marker"]["color"], "teal");
        assert_eq!(value["data"][1]["marker"]["color"], "coral");

        let left = layout["xaxis"]["domain"][1].as_f64().unwrap();
        let right = layout["xaxis2"]["domain"][0].as_f64().unwrap();
        assert!((right - left - 0.05).abs() < 1e-12);
        assert_eq!(layout["annotations"][0]["text"], POPULATION_TITLE);
        assert_eq!(layout["annotations"][1]["text"], DENSITY_TITLE);
    }

    #[test]
    fn document_loads_plotly() {
        let doc = DensityChart::new(&stats()).to_document().unwrap();
        assert!(doc.html().contains(PLOTLY_JS));
        assert!(doc.html().contains("Plotly.newPlot"));
    }
}
