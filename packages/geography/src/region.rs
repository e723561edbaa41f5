//! Prefecture polygons and the measurements derived from them.

use geo::{Area, Centroid, MultiPolygon};
use quake_map_geography_models::LatLng;

use crate::projection::UtmProjection;

/// Square metres per square kilometre.
const SQ_M_PER_SQ_KM: f64 = 1_000_000.0;

/// A prefecture boundary keyed by name.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefectureRegion {
    /// Prefecture name, unique within a dataset.
    pub name: String,
    /// Boundary in EPSG:4326, `x` = longitude, `y` = latitude.
    pub geometry: MultiPolygon<f64>,
}

impl PrefectureRegion {
    /// Land area in square kilometres, measured after reprojecting into
    /// `projection`.
    #[must_use]
    pub fn area_sqkm(&self, projection: &UtmProjection) -> f64 {
        projection.project(&self.geometry).unsigned_area() / SQ_M_PER_SQ_KM
    }

    /// Centroid of the boundary in degrees, or `None` for empty geometry.
    #[must_use]
    pub fn centroid(&self) -> Option<LatLng> {
        self.geometry.centroid().map(|p| LatLng(p.y(), p.x()))
    }
}

/// Mean of every prefecture centroid, the point all maps are centred on.
///
/// Regions with empty geometry are skipped. Returns `None` if no region has
/// a centroid.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn map_center(regions: &[PrefectureRegion]) -> Option<LatLng> {
    let centroids: Vec<LatLng> = regions
        .iter()
        .filter_map(PrefectureRegion::centroid)
        .collect();

    if centroids.is_empty() {
        return None;
    }

    let count = centroids.len() as f64;
    let lat = centroids.iter().map(|c| c.lat()).sum::<f64>() / count;
    let lng = centroids.iter().map(|c| c.lng()).sum::<f64>() / count;

    Some(LatLng(lat, lng))
}
