//! Plate boundary coordinate order normalization.
//!
//! The plate boundary shapefile stores points as `(longitude, latitude)`,
//! while every map layer downstream takes `(latitude, longitude)`.

use quake_map_geography_models::{PlateBoundary, RawBoundary};

/// Swaps every point of a boundary into map order.
///
/// The raw boundary is left untouched; point order and count are preserved.
#[must_use]
pub fn normalize_boundary(raw: &RawBoundary) -> PlateBoundary {
    PlateBoundary {
        points: raw.points.iter().map(|p| p.swapped()).collect(),
    }
}

/// Normalizes a list of boundaries, one output per input.
#[must_use]
pub fn normalize_boundaries(raw: &[RawBoundary]) -> Vec<PlateBoundary> {
    raw.iter().map(normalize_boundary).collect()
}

#[cfg(test)]
mod tests {
    use quake_map_geography_models::{LatLng, LonLat};

    use super::*;

    #[test]
    fn swaps_known_pairs() {
        let raw = RawBoundary {
            points: vec![LonLat(139.0, 35.0), LonLat(140.0, 36.0)],
        };
        let boundary = normalize_boundary(&raw);
        assert_eq!(boundary.points, vec![LatLng(35.0, 139.0), LatLng(36.0, 140.0)]);
    }

    #[test]
    fn preserves_length_and_order() {
        let raw = RawBoundary {
            points: (0..50)
                .map(|i| LonLat(120.0 + f64::from(i) * 0.5, 20.0 + f64::from(i) * 0.25))
                .collect(),
        };
        let boundary = normalize_boundary(&raw);

        assert_eq!(boundary.points.len(), raw.points.len());
        for (input, output) in raw.points.iter().zip(&boundary.points) {
            assert!((output.lat() - input.lat()).abs() < f64::EPSILON);
            assert!((output.lng() - input.lon()).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn leaves_source_untouched() {
        let raw = RawBoundary {
            points: vec![LonLat(141.5, 38.2)],
        };
        let before = raw.clone();
        let _ = normalize_boundary(&raw);
        assert_eq!(raw, before);
    }

    #[test]
    fn handles_empty_segments() {
        let raw = vec![
            RawBoundary { points: vec![] },
            RawBoundary {
                points: vec![LonLat(1.0, 2.0)],
            },
        ];
        let boundaries = normalize_boundaries(&raw);
        assert_eq!(boundaries.len(), 2);
        assert!(boundaries[0].points.is_empty());
        assert_eq!(boundaries[1].points, vec![LatLng(2.0, 1.0)]);
    }
}
