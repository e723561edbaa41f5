#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Plate boundary, earthquake, and prefecture data preparation.
//!
//! Reads the four input datasets (plate boundary shapefile, earthquake CSV,
//! prefecture boundary shapefile, population CSV), swaps plate boundary
//! coordinates into map order, measures prefecture areas in a projected
//! CRS, and joins those areas with population to produce the statistics
//! table used by the renderer.

pub mod load;
pub mod normalize;
pub mod projection;
pub mod region;
pub mod stats;

use thiserror::Error;

pub use region::PrefectureRegion;

/// Errors that can occur while loading or joining geography data.
#[derive(Debug, Error)]
pub enum GeoError {
    /// A shapefile could not be opened or decoded.
    #[error("Shapefile error in {path}: {source}")]
    Shapefile {
        /// Path to the `.shp` file.
        path: String,
        /// Underlying shapefile error.
        source: shapefile::Error,
    },

    /// A CSV file could not be opened or a row could not be decoded.
    #[error("CSV error in {path}: {source}")]
    Csv {
        /// Path to the CSV file.
        path: String,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// A timestamp column held a value none of the known formats accept.
    #[error("Invalid date {value:?} in {path} at row {row}")]
    InvalidDate {
        /// Path to the CSV file.
        path: String,
        /// 1-based data row (the header is not counted).
        row: usize,
        /// The raw cell value.
        value: String,
    },

    /// A shapefile record is missing its key attribute.
    #[error("Record {record} in {path} has no {field:?} attribute")]
    MissingAttribute {
        /// Path to the `.shp` file.
        path: String,
        /// 0-based record index.
        record: usize,
        /// Attribute name that was expected.
        field: String,
    },

    /// A shapefile record has a geometry type the loader cannot use.
    #[error("Record {record} in {path} is a {shape} shape, expected a polygon")]
    UnsupportedShape {
        /// Path to the `.shp` file.
        path: String,
        /// 0-based record index.
        record: usize,
        /// Shape type that was found.
        shape: String,
    },

    /// The same key appeared twice in a keyed input.
    #[error("Duplicate key {key:?} in {path}")]
    DuplicateKey {
        /// Path to the offending file.
        path: String,
        /// The repeated key.
        key: String,
    },

    /// A population row had no matching prefecture area.
    #[error("No area for prefecture {key:?}")]
    UnmatchedKey {
        /// The unmatched prefecture name.
        key: String,
    },
}
