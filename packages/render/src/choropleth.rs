//! Choropleth layers: prefecture polygons filled by a statistics column.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, feature::Id};
use quake_map_geography::PrefectureRegion;
use quake_map_geography_models::{PrefectureStats, PrefectureStatsTable};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};

/// `ColorBrewer` `YlGnBu`, six classes.
pub const YL_GN_BU: [&str; 6] = [
    "#ffffcc", "#c7e9b4", "#7fcdbb", "#41b6c4", "#2c7fb8", "#253494",
];

/// Fill used for prefectures with no value.
pub const NAN_FILL_COLOR: &str = "black";

/// A statistics column a choropleth can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum StatColumn {
    /// Residents per square kilometre.
    Density,
    /// Natural log of density (see [`PrefectureStats::log10_density`]).
    #[strum(to_string = "log10_density")]
    Log10Density,
}

impl StatColumn {
    /// Reads this column from a row. Non-finite values count as missing.
    #[must_use]
    pub fn value(self, row: &PrefectureStats) -> Option<f64> {
        let value = match self {
            Self::Density => row.density,
            Self::Log10Density => row.log10_density,
        };
        value.filter(|v| v.is_finite())
    }
}

/// Legend describing the colour classes of a choropleth.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    /// Legend heading, the bound column name.
    pub title: String,
    /// Class edges, one more than `colors`.
    pub thresholds: Vec<f64>,
    /// One fill colour per class.
    pub colors: Vec<String>,
}

/// A rendered choropleth: prefecture features with their fill resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Choropleth {
    /// Features keyed by prefecture name, each carrying `value` and `fill`
    /// properties.
    pub data: FeatureCollection,
    /// Outline colour.
    pub line_color: String,
    /// Opacity for every fill, including missing values.
    pub fill_opacity: f64,
    /// Class legend, absent when no prefecture has a value.
    pub legend: Option<Legend>,
}

impl Choropleth {
    /// Binds `column` from `stats` onto `regions` by prefecture name.
    ///
    /// Values are split into equal-width classes between the smallest and
    /// largest available value. Regions with no matching row, or whose row
    /// has no value, are filled with [`NAN_FILL_COLOR`].
    #[must_use]
    pub fn new(
        regions: &[PrefectureRegion],
        stats: &PrefectureStatsTable,
        column: StatColumn,
    ) -> Self {
        let values: Vec<Option<f64>> = regions
            .iter()
            .map(|region| stats.get(&region.name).and_then(|row| column.value(row)))
            .collect();

        let bins = Bins::from_values(values.iter().flatten().copied(), YL_GN_BU.len());
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            log::debug!("{missing} prefectures have no {column} value");
        }

        let features = regions
            .iter()
            .zip(&values)
            .map(|(region, value)| {
                let fill = match (value, &bins) {
                    (Some(v), Some(bins)) => YL_GN_BU[bins.class_of(*v)],
                    _ => NAN_FILL_COLOR,
                };

                let mut properties = JsonObject::new();
                properties.insert("name".to_string(), region.name.clone().into());
                properties.insert("value".to_string(), serde_json::json!(value));
                properties.insert("fill".to_string(), fill.into());

                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(geojson::Value::from(&region.geometry))),
                    id: Some(Id::String(region.name.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let legend = bins.map(|bins| Legend {
            title: column.to_string(),
            thresholds: bins.thresholds(),
            colors: YL_GN_BU.iter().map(|c| (*c).to_string()).collect(),
        });

        Self {
            data: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            line_color: "navy".to_string(),
            fill_opacity: 0.8,
            legend,
        }
    }
}

/// Equal-width classes over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bins {
    min: f64,
    max: f64,
    count: usize,
}

impl Bins {
    /// Builds `count` classes spanning the given values, or `None` if there
    /// are no values.
    pub fn from_values(values: impl IntoIterator<Item = f64>, count: usize) -> Option<Self> {
        let mut range: Option<(f64, f64)> = None;
        for v in values {
            range = Some(range.map_or((v, v), |(lo, hi)| (lo.min(v), hi.max(v))));
        }
        range.map(|(min, max)| Self {
            min,
            max,
            count: count.max(1),
        })
    }

    /// Class index of `value`, clamped to `0..count`. The maximum falls in
    /// the last class.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn class_of(&self, value: f64) -> usize {
        let span = self.max - self.min;
        if span <= 0.0 {
            return 0;
        }
        let position = ((value - self.min) / span * self.count as f64).floor();
        if position <= 0.0 {
            0
        } else {
            (position as usize).min(self.count - 1)
        }
    }

    /// Class edges from `min` to `max`, `count + 1` values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn thresholds(&self) -> Vec<f64> {
        let step = (self.max - self.min) / self.count as f64;
        (0..=self.count)
            .map(|i| step.mul_add(i as f64, self.min))
            .collect()
    }
}
