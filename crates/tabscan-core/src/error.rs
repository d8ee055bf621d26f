//! Error types for the tabscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for a table reconstruction request.
#[derive(Error, Debug)]
pub enum TabscanError {
    /// Nothing usable was left to build a table from.
    #[error("empty result: {0}")]
    Empty(#[from] EmptyResult),

    /// An output artifact could not be written.
    #[error("export error: {0}")]
    Export(#[from] ExportError),

    /// An engine payload could not be read at all.
    #[error("engine output error: {0}")]
    Engine(#[from] EngineError),

    /// Source image could not be loaded.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// The request produced nothing to export.
///
/// A legitimately blank page is indistinguishable from a failed recognition
/// at this layer, so both fail the request.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyResult {
    /// No detection survived normalization.
    #[error("no valid detections")]
    NoDetections,

    /// Clustering formed no rows.
    #[error("no rows could be formed")]
    NoRows,
}

/// Errors writing the grid, overlay or preview artifacts.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Filesystem failure for the target path.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Workbook serialization failed.
    #[error("failed to build workbook {}: {source}", path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// Image encoding failed.
    #[error("failed to encode image {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl ExportError {
    /// Path of the artifact that failed.
    pub fn path(&self) -> &std::path::Path {
        match self {
            ExportError::Write { path, .. }
            | ExportError::Workbook { path, .. }
            | ExportError::Encode { path, .. } => path,
        }
    }
}

/// Reasons a single raw detection is rejected.
///
/// These never abort a request: adapters report them to the diagnostics sink
/// and drop the detection.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedDetection {
    /// Text is empty after trimming.
    #[error("empty text")]
    EmptyText,

    /// Region does not have exactly four corners.
    #[error("region has {0} points, expected 4")]
    RegionPoints(usize),

    /// The engine supplied no score at all.
    #[error("missing confidence")]
    MissingConfidence,

    /// A coordinate or score is NaN or infinite.
    #[error("non-finite coordinate or score")]
    NonFinite,

    /// Score falls outside [0, 1] after scaling.
    #[error("confidence {0} outside [0, 1]")]
    ConfidenceOutOfRange(f32),
}

/// Errors reading a whole engine payload.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Payload is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Payload is not valid TSV.
    #[error("invalid TSV: {0}")]
    Tsv(#[from] csv::Error),

    /// Payload parsed but has the wrong overall shape.
    #[error("unexpected payload shape: {0}")]
    Shape(String),

    /// The in-process engine failed to load or run.
    #[error("engine failed: {0}")]
    Model(String),
}

/// Result type for the tabscan library.
pub type Result<T> = std::result::Result<T, TabscanError>;
