#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Self-contained HTML map and chart documents.
//!
//! Maps are emitted as Leaflet pages and the density chart as a Plotly
//! page; both load their JavaScript libraries from a CDN and carry all data
//! inline, so every file opens on its own in a browser. Each artifact is
//! written twice: a standalone page and an `<iframe srcdoc>` fragment that
//! can be dropped into another document.

pub mod artifacts;
pub mod chart;
pub mod choropleth;
pub mod map;
pub mod output;

use thiserror::Error;

pub use artifacts::{Artifact, MapInputs, MapStyle, render};
pub use map::Tiles;
pub use output::{HtmlDocument, WrittenArtifact, open_in_viewer};

/// Errors that can occur while rendering or writing artifacts.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Writing an artifact file failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being written or opened.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Serializing layer or figure data failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external viewer exited unsuccessfully.
    #[error("Viewer exited with {status} for {path}")]
    Viewer {
        /// Path handed to the viewer.
        path: String,
        /// Exit status of the launcher.
        status: std::process::ExitStatus,
    },
}

/// Makes serialized JSON safe to inline inside a `<script>` element.
pub(crate) fn script_safe_json(json: &str) -> String {
    json.replace("</", "<\\/")
}
