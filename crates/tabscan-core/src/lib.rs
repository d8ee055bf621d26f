//! Core library for turning OCR detections into a confidence-coded table.
//!
//! This crate provides:
//! - Engine adapters normalizing PaddleOCR, EasyOCR and Tesseract output
//! - Row clustering and column ordering of detections
//! - Confidence tiering with configurable thresholds
//! - XLSX grid export, overlay rendering and table previews

pub mod diagnostics;
pub mod engines;
pub mod error;
pub mod export;
pub mod layout;
pub mod models;
pub mod pipeline;
pub mod render;

pub use diagnostics::{
    CollectingDiagnostics, Diagnostics, NullDiagnostics, TracingDiagnostics, Warning,
};
pub use engines::{normalize, normalize_all, DetectionReader, EngineKind, RawDetection, RawScore};
pub use error::{EmptyResult, EngineError, ExportError, MalformedDetection, Result, TabscanError};
pub use layout::{build_table, group_into_rows, order_columns, ConfidenceThresholds, Tier};
pub use models::config::TabscanConfig;
pub use models::detection::{Detection, Point};
pub use models::table::{Cell, Table};
pub use pipeline::{OutputPaths, PipelineReport, TablePipeline};
