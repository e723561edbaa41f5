//! Prefecture area measurement and the population join.
//!
//! Areas are measured per region in a projected CRS, then joined onto the
//! population table by prefecture name. The population table drives the
//! join: every output row corresponds to a population row, and regions with
//! no population never appear. What happens to population rows without an
//! area is decided by the caller's [`JoinPolicy`].

use std::collections::BTreeMap;

use quake_map_geography_models::{
    JoinPolicy, PopulationRecord, PrefectureStats, PrefectureStatsTable,
};

use crate::GeoError;
use crate::projection::UtmProjection;
use crate::region::PrefectureRegion;

/// Projected area per prefecture name, in square kilometres.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaTable {
    areas: BTreeMap<String, f64>,
}

impl AreaTable {
    /// Area for `name`, if that prefecture was measured.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.areas.get(name).copied()
    }
}

impl FromIterator<(String, f64)> for AreaTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            areas: iter.into_iter().collect(),
        }
    }
}

/// Measures every region's area in `projection`.
#[must_use]
pub fn compute_areas(regions: &[PrefectureRegion], projection: &UtmProjection) -> AreaTable {
    log::debug!(
        "Measuring {} prefecture areas in EPSG:{}",
        regions.len(),
        projection.epsg()
    );

    regions
        .iter()
        .map(|region| (region.name.clone(), region.area_sqkm(projection)))
        .collect()
}

/// Joins population rows with measured areas on prefecture name.
///
/// Output rows keep population-table order. Each unmatched name is logged
/// at `warn` before `policy` is applied.
///
/// # Errors
///
/// Returns [`GeoError::UnmatchedKey`] for the first unmatched row when
/// `policy` is [`JoinPolicy::Fail`].
pub fn join(
    population: &[PopulationRecord],
    areas: &AreaTable,
    policy: JoinPolicy,
) -> Result<PrefectureStatsTable, GeoError> {
    let mut rows = Vec::with_capacity(population.len());
    let mut unmatched = 0usize;

    for record in population {
        let area = areas.get(&record.prefecture);

        if area.is_none() {
            unmatched += 1;
            log::warn!("No boundary area for prefecture {:?}", record.prefecture);
            match policy {
                JoinPolicy::Fill => {}
                JoinPolicy::Drop => continue,
                JoinPolicy::Fail => {
                    return Err(GeoError::UnmatchedKey {
                        key: record.prefecture.clone(),
                    });
                }
            }
        }

        rows.push(PrefectureStats::new(
            record.prefecture.clone(),
            record.population,
            area,
        ));
    }

    log::info!(
        "Joined {} prefectures ({unmatched} without area, policy {policy})",
        rows.len()
    );

    Ok(PrefectureStatsTable::new(rows))
}
