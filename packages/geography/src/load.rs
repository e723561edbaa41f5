//! Readers for the four pipeline inputs.
//!
//! Every reader opens its file, parses it completely, and drops the handle
//! before returning. Parse failures are wrapped with the offending path and
//! returned immediately; nothing is skipped or recovered.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use quake_map_geography_models::{EarthquakeRecord, LonLat, PopulationRecord, RawBoundary};
use serde::Deserialize;
use shapefile::dbase::FieldValue;
use shapefile::{PolygonRing, Shape};

use crate::GeoError;
use crate::region::PrefectureRegion;

/// Attribute holding the prefecture name in the boundary shapefile.
pub const PREFECTURE_FIELD: &str = "prefecture";

/// Naive timestamp layouts accepted in the earthquake `DateTime` column.
const DATE_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Reads every segment of the plate boundary shapefile.
///
/// Each polyline part and each polygon ring becomes one [`RawBoundary`]
/// with points kept in storage order. Null shapes and point shapes carry no
/// line geometry and are skipped.
///
/// # Errors
///
/// Returns [`GeoError::Shapefile`] if the file cannot be read.
pub fn read_plate_boundaries(path: &Path) -> Result<Vec<RawBoundary>, GeoError> {
    let shapes = shapefile::read_shapes(path).map_err(|e| shapefile_error(path, e))?;

    let mut boundaries = Vec::new();
    for shape in &shapes {
        boundaries.extend(shape_segments(shape));
    }

    log::info!(
        "Loaded {} plate boundary segments from {} shapes in {}",
        boundaries.len(),
        shapes.len(),
        path.display()
    );

    Ok(boundaries)
}

fn shape_segments(shape: &Shape) -> Vec<RawBoundary> {
    fn segment(points: impl IntoIterator<Item = (f64, f64)>) -> RawBoundary {
        RawBoundary {
            points: points.into_iter().map(|(x, y)| LonLat(x, y)).collect(),
        }
    }

    match shape {
        Shape::Polyline(line) => line
            .parts()
            .iter()
            .map(|part| segment(part.iter().map(|p| (p.x, p.y))))
            .collect(),
        Shape::PolylineM(line) => line
            .parts()
            .iter()
            .map(|part| segment(part.iter().map(|p| (p.x, p.y))))
            .collect(),
        Shape::PolylineZ(line) => line
            .parts()
            .iter()
            .map(|part| segment(part.iter().map(|p| (p.x, p.y))))
            .collect(),
        Shape::Polygon(poly) => poly
            .rings()
            .iter()
            .map(|ring| segment(ring.points().iter().map(|p| (p.x, p.y))))
            .collect(),
        Shape::PolygonM(poly) => poly
            .rings()
            .iter()
            .map(|ring| segment(ring.points().iter().map(|p| (p.x, p.y))))
            .collect(),
        Shape::PolygonZ(poly) => poly
            .rings()
            .iter()
            .map(|ring| segment(ring.points().iter().map(|p| (p.x, p.y))))
            .collect(),
        other => {
            log::debug!("Skipping {:?} shape in plate boundaries", other.shapetype());
            Vec::new()
        }
    }
}

/// Raw earthquake CSV row; any other columns are ignored.
#[derive(Debug, Deserialize)]
struct EarthquakeRow {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
    #[serde(rename = "Magnitude")]
    magnitude: f64,
}

/// Reads the historical earthquake CSV.
///
/// # Errors
///
/// Returns [`GeoError::Csv`] if the file cannot be read or a row does not
/// decode, and [`GeoError::InvalidDate`] if a `DateTime` cell matches none
/// of the accepted layouts.
pub fn read_earthquakes(path: &Path) -> Result<Vec<EarthquakeRecord>, GeoError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<EarthquakeRow>().enumerate() {
        let row = result.map_err(|e| csv_error(path, e))?;
        let occurred_at =
            parse_timestamp(&row.date_time).ok_or_else(|| GeoError::InvalidDate {
                path: path.display().to_string(),
                row: index + 1,
                value: row.date_time.clone(),
            })?;

        records.push(EarthquakeRecord {
            occurred_at,
            latitude: row.latitude,
            longitude: row.longitude,
            magnitude: row.magnitude,
        });
    }

    log::info!(
        "Loaded {} earthquakes from {}",
        records.len(),
        path.display()
    );

    Ok(records)
}

/// Parses an earthquake timestamp. Naive values are taken as UTC.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        .map(|naive| naive.and_utc())
}

/// Reads the prefecture boundary shapefile, keyed by its `prefecture`
/// attribute.
///
/// # Errors
///
/// Returns [`GeoError::Shapefile`] if the `.shp`/`.dbf` pair cannot be read,
/// [`GeoError::MissingAttribute`] if a record has no name,
/// [`GeoError::UnsupportedShape`] for non-polygon records, and
/// [`GeoError::DuplicateKey`] if two records share a name.
pub fn read_prefectures(path: &Path) -> Result<Vec<PrefectureRegion>, GeoError> {
    let mut reader = shapefile::Reader::from_path(path).map_err(|e| shapefile_error(path, e))?;

    let mut regions = Vec::new();
    let mut seen = BTreeSet::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result.map_err(|e| shapefile_error(path, e))?;

        let name = match record.get(PREFECTURE_FIELD) {
            Some(FieldValue::Character(Some(value))) if !value.trim().is_empty() => {
                value.trim().to_string()
            }
            _ => {
                return Err(GeoError::MissingAttribute {
                    path: path.display().to_string(),
                    record: index,
                    field: PREFECTURE_FIELD.to_string(),
                });
            }
        };

        let geometry = match &shape {
            Shape::Polygon(poly) => rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)),
            Shape::PolygonM(poly) => rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)),
            Shape::PolygonZ(poly) => rings_to_multipolygon(poly.rings(), |p| (p.x, p.y)),
            other => {
                return Err(GeoError::UnsupportedShape {
                    path: path.display().to_string(),
                    record: index,
                    shape: format!("{:?}", other.shapetype()),
                });
            }
        };

        if !seen.insert(name.clone()) {
            return Err(GeoError::DuplicateKey {
                path: path.display().to_string(),
                key: name,
            });
        }

        regions.push(PrefectureRegion { name, geometry });
    }

    log::info!(
        "Loaded {} prefecture boundaries from {}",
        regions.len(),
        path.display()
    );

    Ok(regions)
}

/// Groups shapefile rings into polygons: each outer ring starts a polygon
/// and the inner rings that follow it become its holes.
fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> (f64, f64),
) -> MultiPolygon<f64> {
    let to_line = |points: &[P]| -> LineString<f64> {
        points
            .iter()
            .map(|p| {
                let (x, y) = xy(p);
                Coord { x, y }
            })
            .collect()
    };

    let mut polygons: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        match ring {
            PolygonRing::Outer(points) => polygons.push((to_line(points.as_slice()), Vec::new())),
            PolygonRing::Inner(points) => {
                if let Some((_, holes)) = polygons.last_mut() {
                    holes.push(to_line(points.as_slice()));
                } else {
                    log::debug!("Dropping inner ring with no preceding outer ring");
                }
            }
        }
    }

    MultiPolygon(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

/// Raw population CSV row; any other columns are ignored.
#[derive(Debug, Deserialize)]
struct PopulationRow {
    prefecture: String,
    population: u64,
}

/// Reads the per-prefecture population CSV.
///
/// # Errors
///
/// Returns [`GeoError::Csv`] if the file cannot be read or a row does not
/// decode, and [`GeoError::DuplicateKey`] if a prefecture appears twice.
pub fn read_population(path: &Path) -> Result<Vec<PopulationRecord>, GeoError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;

    let mut records = Vec::new();
    let mut seen = BTreeSet::new();

    for result in reader.deserialize::<PopulationRow>() {
        let row = result.map_err(|e| csv_error(path, e))?;

        if !seen.insert(row.prefecture.clone()) {
            return Err(GeoError::DuplicateKey {
                path: path.display().to_string(),
                key: row.prefecture,
            });
        }

        records.push(PopulationRecord {
            prefecture: row.prefecture,
            population: row.population,
        });
    }

    log::info!(
        "Loaded population for {} prefectures from {}",
        records.len(),
        path.display()
    );

    Ok(records)
}

fn shapefile_error(path: &Path, source: shapefile::Error) -> GeoError {
    GeoError::Shapefile {
        path: path.display().to_string(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> GeoError {
    GeoError::Csv {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use shapefile::dbase::{FieldName, Record, TableWriterBuilder};
    use shapefile::{
        NO_DATA, Point, PointM, PointZ, Polygon as ShpPolygon, PolygonM, Polyline, PolylineZ,
        ShapeWriter, Writer,
    };

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("quake_map_load_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_prefectures(path: &Path, rows: &[(Option<&str>, ShpPolygon)]) {
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from(PREFECTURE_FIELD).unwrap(), 50);
        let mut writer = Writer::from_path(path, table).unwrap();
        for (name, polygon) in rows {
            let mut record = Record::default();
            record.insert(
                PREFECTURE_FIELD.to_string(),
                FieldValue::Character(name.map(str::to_string)),
            );
            writer.write_shape_and_record(polygon, &record).unwrap();
        }
    }

    fn square(lon: f64, lat: f64, size: f64) -> ShpPolygon {
        ShpPolygon::new(PolygonRing::Outer(vec![
            Point::new(lon, lat),
            Point::new(lon, lat + size),
            Point::new(lon + size, lat + size),
            Point::new(lon + size, lat),
            Point::new(lon, lat),
        ]))
    }

    #[test]
    fn parses_kaggle_timestamp() {
        let dt = parse_timestamp("1970/01/04 17:00:40.20").unwrap();
        assert_eq!(dt.to_string(), "1970-01-04 17:00:40.200 UTC");
    }

    #[test]
    fn parses_iso_timestamps() {
        let dt = parse_timestamp("2011-03-11 05:46:24").unwrap();
        assert_eq!(dt.to_string(), "2011-03-11 05:46:24 UTC");

        let dt = parse_timestamp("2011-03-11T14:46:24+09:00").unwrap();
        assert_eq!(dt.to_string(), "2011-03-11 05:46:24 UTC");
    }

    #[test]
    fn rejects_invalid_timestamp() {
        assert!(parse_timestamp("March 11th").is_none());
    }

    #[test]
    fn reads_earthquake_csv() {
        let dir = scratch_dir("earthquakes");
        let path = dir.join("earthquakes.csv");
        std::fs::write(
            &path,
            "DateTime,Latitude,Longitude,Depth,Magnitude,MagType\n\
             1970/01/04 17:00:40.20,24.139,102.503,31,7.5,Ms\n\
             2011/03/11 05:46:24.12,38.297,142.373,29,9.1,Mw\n",
        )
        .unwrap();

        let quakes = read_earthquakes(&path).unwrap();
        assert_eq!(quakes.len(), 2);
        assert!((quakes[1].magnitude - 9.1).abs() < f64::EPSILON);
        assert!((quakes[1].location().lat() - 38.297).abs() < f64::EPSILON);
        assert_eq!(quakes[1].occurred_at.date_naive().to_string(), "2011-03-11");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bad_earthquake_date_aborts() {
        let dir = scratch_dir("bad_dates");
        let path = dir.join("earthquakes.csv");
        std::fs::write(
            &path,
            "DateTime,Latitude,Longitude,Magnitude\n\
             1970/01/04 17:00:40.20,24.1,102.5,7.5\n\
             yesterday,24.1,102.5,7.5\n",
        )
        .unwrap();

        let err = read_earthquakes(&path).unwrap_err();
        assert!(matches!(err, GeoError::InvalidDate { row: 2, ref value, .. } if value == "yesterday"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_is_csv_error() {
        let err = read_population(Path::new("/nonexistent/population.csv")).unwrap_err();
        assert!(matches!(err, GeoError::Csv { .. }));
    }

    #[test]
    fn reads_population_csv() {
        let dir = scratch_dir("population");
        let path = dir.join("population.csv");
        std::fs::write(
            &path,
            "prefecture,capital,population,area\n\
             Tokyo,Tokyo,13515271,2191\n\
             Chiba, Chiba ,6222666,5157\n",
        )
        .unwrap();

        let rows = read_population(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].prefecture, "Chiba");
        assert_eq!(rows[1].population, 6_222_666);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_population_key_fails() {
        let dir = scratch_dir("population_dupes");
        let path = dir.join("population.csv");
        std::fs::write(&path, "prefecture,population\nTokyo,1\nTokyo,2\n").unwrap();

        let err = read_population(&path).unwrap_err();
        assert!(matches!(err, GeoError::DuplicateKey { ref key, .. } if key == "Tokyo"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reads_plate_boundary_polylines() {
        let dir = scratch_dir("plates");
        let path = dir.join("plates.shp");
        let lines = vec![
            Polyline::new(vec![Point::new(139.0, 35.0), Point::new(140.0, 36.0)]),
            Polyline::with_parts(vec![
                vec![Point::new(141.0, 37.0), Point::new(142.0, 38.0)],
                vec![Point::new(143.0, 39.0), Point::new(144.0, 40.0), Point::new(145.0, 41.0)],
            ]),
        ];
        ShapeWriter::from_path(&path).unwrap().write_shapes(&lines).unwrap();

        let boundaries = read_plate_boundaries(&path).unwrap();
        assert_eq!(boundaries.len(), 3);
        assert_eq!(
            boundaries[0].points,
            vec![LonLat(139.0, 35.0), LonLat(140.0, 36.0)]
        );
        assert_eq!(boundaries[2].points.len(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reads_prefecture_polygons() {
        let dir = scratch_dir("prefectures");
        let path = dir.join("prefectures.shp");
        write_prefectures(
            &path,
            &[
                (Some("Tokyo"), square(139.0, 35.5, 0.5)),
                (Some(" Chiba "), square(140.0, 35.0, 0.8)),
            ],
        );

        let regions = read_prefectures(&path).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Tokyo");
        assert_eq!(regions[1].name, "Chiba");
        assert_eq!(regions[0].geometry.0.len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn duplicate_prefecture_fails() {
        let dir = scratch_dir("prefecture_dupes");
        let path = dir.join("prefectures.shp");
        write_prefectures(
            &path,
            &[
                (Some("Tokyo"), square(139.0, 35.5, 0.5)),
                (Some("Tokyo"), square(140.0, 35.0, 0.8)),
            ],
        );

        let err = read_prefectures(&path).unwrap_err();
        assert!(matches!(err, GeoError::DuplicateKey { ref key, .. } if key == "Tokyo"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unnamed_prefecture_fails() {
        let dir = scratch_dir("prefecture_unnamed");
        let path = dir.join("prefectures.shp");
        write_prefectures(&path, &[(None, square(139.0, 35.5, 0.5))]);

        let err = read_prefectures(&path).unwrap_err();
        assert!(matches!(err, GeoError::MissingAttribute { record: 0, .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn holes_attach_to_preceding_outer_ring() {
        let rings = vec![
            PolygonRing::Outer(vec![
                Point::new(0.0, 0.0),
                Point::new(0.0, 10.0),
                Point::new(10.0, 10.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 0.0),
            ]),
            PolygonRing::Inner(vec![
                Point::new(2.0, 2.0),
                Point::new(4.0, 2.0),
                Point::new(4.0, 4.0),
                Point::new(2.0, 4.0),
                Point::new(2.0, 2.0),
            ]),
            PolygonRing::Outer(vec![
                Point::new(20.0, 0.0),
                Point::new(20.0, 1.0),
                Point::new(21.0, 1.0),
                Point::new(21.0, 0.0),
                Point::new(20.0, 0.0),
            ]),
        ];

        let mp = rings_to_multipolygon(&rings, |p| (p.x, p.y));
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!(mp.0[1].interiors().is_empty());
    }
    #[test]
    fn plate_polygon_rings_become_segments() {
        let dir = scratch_dir("plate_polygons");
        let path = dir.join("plates.shp");
        let polygon = ShpPolygon::with_rings(vec![
            PolygonRing::Outer(vec![
                Point::new(139.0, 35.0),
                Point::new(139.0, 36.0),
                Point::new(140.0, 36.0),
                Point::new(140.0, 35.0),
                Point::new(139.0, 35.0),
            ]),
            PolygonRing::Inner(vec![
                Point::new(139.2, 35.2),
                Point::new(139.4, 35.2),
                Point::new(139.4, 35.4),
                Point::new(139.2, 35.4),
                Point::new(139.2, 35.2),
            ]),
        ]);
        ShapeWriter::from_path(&path)
            .unwrap()
            .write_shapes(&vec![polygon])
            .unwrap();

        let boundaries = read_plate_boundaries(&path).unwrap();
        assert_eq!(boundaries.len(), 2);
        assert_eq!(boundaries[0].points[0], LonLat(139.0, 35.0));
        assert_eq!(boundaries[0].points.len(), 5);
        assert_eq!(boundaries[1].points.len(), 5);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn z_and_m_plate_shapes_keep_only_xy() {
        let dir = scratch_dir("plates_zm");

        let lines_path = dir.join("plates_z.shp");
        ShapeWriter::from_path(&lines_path)
            .unwrap()
            .write_shapes(&vec![PolylineZ::new(vec![
                PointZ::new(141.0, 37.0, -10.0, NO_DATA),
                PointZ::new(142.0, 38.0, -20.0, NO_DATA),
            ])])
            .unwrap();

        let boundaries = read_plate_boundaries(&lines_path).unwrap();
        assert_eq!(
            boundaries[0].points,
            vec![LonLat(141.0, 37.0), LonLat(142.0, 38.0)]
        );

        let rings_path = dir.join("plates_m.shp");
        ShapeWriter::from_path(&rings_path)
            .unwrap()
            .write_shapes(&vec![PolygonM::new(PolygonRing::Outer(vec![
                PointM::new(130.0, 30.0, 1.0),
                PointM::new(130.0, 31.0, 2.0),
                PointM::new(131.0, 31.0, 3.0),
                PointM::new(130.0, 30.0, 1.0),
            ]))])
            .unwrap();

        let boundaries = read_plate_boundaries(&rings_path).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].points[0], LonLat(130.0, 30.0));
        assert!(
            boundaries[0]
                .points
                .iter()
                .all(|p| (130.0..=131.0).contains(&p.lon()) && (30.0..=31.0).contains(&p.lat()))
        );

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn null_and_point_shapes_carry_no_segments() {
        assert!(shape_segments(&Shape::NullShape).is_empty());
        assert!(shape_segments(&Shape::Point(Point::new(139.0, 35.0))).is_empty());

        let dir = scratch_dir("plates_points");
        let path = dir.join("plates.shp");
        ShapeWriter::from_path(&path)
            .unwrap()
            .write_shapes(&vec![Point::new(139.0, 35.0), Point::new(140.0, 36.0)])
            .unwrap();

        assert!(read_plate_boundaries(&path).unwrap().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn point_prefecture_is_unsupported_shape() {
        let dir = scratch_dir("prefecture_points");
        let path = dir.join("prefectures.shp");
        let table = TableWriterBuilder::new()
            .add_character_field(FieldName::try_from(PREFECTURE_FIELD).unwrap(), 50);
        let mut writer = Writer::from_path(&path, table).unwrap();
        let mut record = Record::default();
        record.insert(
            PREFECTURE_FIELD.to_string(),
            FieldValue::Character(Some("Tokyo".to_string())),
        );
        writer
            .write_shape_and_record(&Point::new(139.7, 35.7), &record)
            .unwrap();
        drop(writer);

        let err = read_prefectures(&path).unwrap_err();
        assert!(matches!(
            err,
            GeoError::UnsupportedShape { record: 0, ref shape, .. } if shape == "Point"
        ));
        assert!(err.to_string().contains("prefectures.shp"), "{err}");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
