//! One request: detections to workbook, overlay and preview.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{ExportError, TabscanError};
use crate::export::{write_all_atomically, GridExporter};
use crate::layout::{build_table, ConfidenceThresholds};
use crate::models::config::{ExportConfig, TabscanConfig};
use crate::models::detection::Detection;
use crate::models::table::Table;
use crate::render::{draw_overlay, draw_table_preview, encode_image, OverlayStyle};

/// Where a request writes its artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub workbook: PathBuf,
    pub overlay: Option<PathBuf>,
    pub preview: Option<PathBuf>,
}

impl OutputPaths {
    /// Derive output names from an input file.
    ///
    /// Files land in the configured output directory, or next to `input`.
    pub fn derive(input: &Path, export: &ExportConfig, with_image: bool) -> Self {
        let dir = export
            .output_dir
            .clone()
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "table".to_string());

        Self {
            workbook: dir.join(format!("{}_output.xlsx", stem)),
            overlay: with_image.then(|| {
                dir.join(format!(
                    "{}_output_image.{}",
                    stem,
                    export.overlay_extension.trim_start_matches('.')
                ))
            }),
            preview: export
                .write_preview
                .then(|| dir.join(format!("{}_output_preview.png", stem))),
        }
    }
}

/// Outcome of a successful request.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub table: Table,
    pub workbook_path: PathBuf,
    pub overlay_path: Option<PathBuf>,
    pub preview_path: Option<PathBuf>,
    /// Detections handed to the pipeline.
    pub detection_count: usize,
    pub row_count: usize,
}

/// Resolved settings for turning detections into artifacts.
///
/// Holds no per-request state, so one pipeline may serve concurrent requests
/// that target distinct output paths.
pub struct TablePipeline {
    y_threshold: f32,
    thresholds: ConfidenceThresholds,
    exporter: GridExporter,
    style: OverlayStyle,
    export: ExportConfig,
}

impl TablePipeline {
    /// Validate `config` and resolve thresholds, font and exporter.
    pub fn new(config: &TabscanConfig, diagnostics: &dyn Diagnostics) -> Result<Self, TabscanError> {
        config.validate()?;
        let thresholds = config.thresholds()?;
        if let Some(green) = thresholds.clamped_from() {
            diagnostics.warn(Warning::ThresholdsClamped {
                green,
                yellow: thresholds.yellow(),
            });
        }

        Ok(Self {
            y_threshold: config.layout.y_threshold,
            exporter: GridExporter::new(thresholds)
                .with_column_padding(config.export.column_padding),
            thresholds,
            style: OverlayStyle::from_config(&config.overlay, diagnostics),
            export: config.export.clone(),
        })
    }

    /// Replace the overlay style.
    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn thresholds(&self) -> &ConfidenceThresholds {
        &self.thresholds
    }

    pub fn y_threshold(&self) -> f32 {
        self.y_threshold
    }

    /// Output paths for `input` under this pipeline's export settings.
    pub fn output_paths(&self, input: &Path, with_image: bool) -> OutputPaths {
        OutputPaths::derive(input, &self.export, with_image)
    }

    /// Cluster and order detections without writing anything.
    pub fn build(&self, detections: &[Detection]) -> Result<Table, TabscanError> {
        Ok(build_table(detections, self.y_threshold)?)
    }

    /// Run one request.
    ///
    /// The overlay is drawn from the full detection list and only when both
    /// `image` and an overlay path are given. Every artifact is encoded
    /// before the first one is written, and a failed write removes the
    /// artifacts already written, so a failed request leaves no outputs.
    pub fn run(
        &self,
        detections: &[Detection],
        image: Option<&Path>,
        paths: &OutputPaths,
        diagnostics: &dyn Diagnostics,
    ) -> Result<PipelineReport, TabscanError> {
        debug!("Building table from {} detections", detections.len());
        let table = self.build(detections)?;
        info!(
            "Reconstructed {} rows, {} columns",
            table.row_count(),
            table.column_count()
        );

        let source = match (image, paths.overlay.as_deref()) {
            (Some(source), Some(_)) => Some(image::open(source)?),
            _ => None,
        };

        let workbook = self
            .exporter
            .to_buffer(&table)
            .map_err(|source| ExportError::Workbook {
                path: paths.workbook.clone(),
                source,
            })?;
        let mut artifacts = vec![(paths.workbook.as_path(), workbook)];

        let overlay_path = match (source, paths.overlay.as_deref()) {
            (Some(source), Some(output)) => {
                let canvas = draw_overlay(&source, detections, &self.style, diagnostics);
                artifacts.push((output, encode_image(canvas, output)?));
                Some(output.to_path_buf())
            }
            _ => None,
        };

        let preview_path = match paths.preview.as_deref() {
            Some(output) => {
                let canvas = draw_table_preview(
                    &table,
                    &self.thresholds,
                    self.style.font.as_ref(),
                    self.style.font_scale,
                );
                artifacts.push((output, encode_image(canvas, output)?));
                Some(output.to_path_buf())
            }
            None => None,
        };

        write_all_atomically(&artifacts)?;

        info!(
            "Workbook with {} rows x {} columns saved at: {}",
            table.row_count(),
            table.column_count(),
            paths.workbook.display()
        );
        if let Some(path) = &overlay_path {
            info!("Image with bounding boxes saved at: {}", path.display());
        }
        if let Some(path) = &preview_path {
            info!("Table preview saved at: {}", path.display());
        }

        Ok(PipelineReport {
            row_count: table.row_count(),
            detection_count: detections.len(),
            table,
            workbook_path: paths.workbook.clone(),
            overlay_path,
            preview_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CollectingDiagnostics, NullDiagnostics};
    use crate::error::EmptyResult;
    use image::{DynamicImage, Rgb, RgbImage};
    use pretty_assertions::assert_eq;

    fn pipeline(config: &TabscanConfig) -> TablePipeline {
        TablePipeline::new(config, &NullDiagnostics)
            .unwrap()
            .with_style(OverlayStyle::without_font())
    }

    fn ragged_detections() -> Vec<Detection> {
        vec![
            Detection::from_box(10.0, 10.0, 40.0, 12.0, "Item", 0.99),
            Detection::from_box(60.0, 11.0, 40.0, 12.0, "Qty", 0.95),
            Detection::from_box(110.0, 9.0, 40.0, 12.0, "Price", 0.50),
            Detection::from_box(10.0, 50.0, 40.0, 12.0, "Bolt", 0.98),
            Detection::from_box(10.0, 90.0, 40.0, 12.0, "Nut", 0.93),
            Detection::from_box(110.0, 91.0, 40.0, 12.0, "0.10", 0.97),
        ]
    }

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("scan.png");
        DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 120, Rgb([255, 255, 255])))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_derive_paths_next_to_input() {
        let paths = OutputPaths::derive(Path::new("/data/invoice.png"), &ExportConfig::default(), true);
        assert_eq!(paths.workbook, PathBuf::from("/data/invoice_output.xlsx"));
        assert_eq!(paths.overlay, Some(PathBuf::from("/data/invoice_output_image.jpg")));
        assert_eq!(paths.preview, None);
    }

    #[test]
    fn test_derive_paths_in_output_dir() {
        let export = ExportConfig {
            output_dir: Some(PathBuf::from("/out")),
            overlay_extension: ".png".to_string(),
            write_preview: true,
            ..ExportConfig::default()
        };
        let paths = OutputPaths::derive(Path::new("scans/page1.json"), &export, false);
        assert_eq!(paths.workbook, PathBuf::from("/out/page1_output.xlsx"));
        assert_eq!(paths.overlay, None);
        assert_eq!(paths.preview, Some(PathBuf::from("/out/page1_output_preview.png")));

        let paths = OutputPaths::derive(Path::new("page1.json"), &export, true);
        assert_eq!(paths.overlay, Some(PathBuf::from("/out/page1_output_image.png")));
    }

    #[test]
    fn test_ragged_rows_export() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&TabscanConfig::default());
        let paths = OutputPaths {
            workbook: dir.path().join("t.xlsx"),
            overlay: None,
            preview: None,
        };

        let report = pipeline
            .run(&ragged_detections(), None, &paths, &CollectingDiagnostics::new())
            .unwrap();

        let lengths: Vec<usize> = report.table.rows().iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![3, 1, 2]);
        assert_eq!(report.table.column_count(), 3);
        assert_eq!(report.row_count, 3);
        assert_eq!(report.detection_count, 6);
        assert!(report.workbook_path.exists());
        assert_eq!(report.overlay_path, None);
    }

    #[test]
    fn test_runs_are_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let mut config = TabscanConfig::default();
        config.export.write_preview = true;
        config.export.overlay_extension = "png".to_string();
        let pipeline = pipeline(&config);
        let diag = CollectingDiagnostics::new();

        let mut artifacts = Vec::new();
        for name in ["first", "second"] {
            let out = dir.path().join(name);
            std::fs::create_dir(&out).unwrap();
            let paths = OutputPaths {
                workbook: out.join("t.xlsx"),
                overlay: Some(out.join("o.png")),
                preview: Some(out.join("p.png")),
            };
            pipeline.run(&ragged_detections(), Some(&image), &paths, &diag).unwrap();
            artifacts.push([
                std::fs::read(&paths.workbook).unwrap(),
                std::fs::read(paths.overlay.as_ref().unwrap()).unwrap(),
                std::fs::read(paths.preview.as_ref().unwrap()).unwrap(),
            ]);
        }

        assert!(artifacts[0] == artifacts[1]);
    }

    #[test]
    fn test_empty_input_fails_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths {
            workbook: dir.path().join("t.xlsx"),
            overlay: None,
            preview: None,
        };

        let err = pipeline(&TabscanConfig::default())
            .run(&[], None, &paths, &CollectingDiagnostics::new())
            .unwrap_err();

        assert!(matches!(err, TabscanError::Empty(EmptyResult::NoDetections)));
        assert!(!paths.workbook.exists());
    }

    #[test]
    fn test_undecodable_image_leaves_no_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("scan.png");
        std::fs::write(&image, "not an image").unwrap();
        let paths = OutputPaths {
            workbook: dir.path().join("t.xlsx"),
            overlay: Some(dir.path().join("o.png")),
            preview: None,
        };

        let err = pipeline(&TabscanConfig::default())
            .run(&ragged_detections(), Some(&image), &paths, &CollectingDiagnostics::new())
            .unwrap_err();

        assert!(matches!(err, TabscanError::Image(_)));
        assert!(!paths.workbook.exists());
        assert!(!dir.path().join("o.png").exists());
    }

    #[test]
    fn test_unencodable_preview_leaves_no_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let paths = OutputPaths {
            workbook: dir.path().join("t.xlsx"),
            overlay: None,
            preview: Some(dir.path().join("p.nope")),
        };

        let err = pipeline(&TabscanConfig::default())
            .run(&ragged_detections(), None, &paths, &CollectingDiagnostics::new())
            .unwrap_err();

        assert!(matches!(err, TabscanError::Export(ExportError::Encode { .. })));
        assert!(!paths.workbook.exists());
    }

    #[test]
    fn test_failed_overlay_write_removes_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_image(dir.path());
        let overlay = dir.path().join("missing").join("o.png");
        let paths = OutputPaths {
            workbook: dir.path().join("t.xlsx"),
            overlay: Some(overlay.clone()),
            preview: None,
        };

        let err = pipeline(&TabscanConfig::default())
            .run(&ragged_detections(), Some(&image), &paths, &CollectingDiagnostics::new())
            .unwrap_err();

        match err {
            TabscanError::Export(export) => assert_eq!(export.path(), overlay.as_path()),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!paths.workbook.exists());
    }

    #[test]
    fn test_missing_output_dir_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let workbook = dir.path().join("missing").join("t.xlsx");
        let paths = OutputPaths {
            workbook: workbook.clone(),
            overlay: None,
            preview: None,
        };

        let err = pipeline(&TabscanConfig::default())
            .run(&ragged_detections(), None, &paths, &CollectingDiagnostics::new())
            .unwrap_err();

        match err {
            TabscanError::Export(export) => assert_eq!(export.path(), workbook.as_path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inverted_thresholds_are_clamped_and_reported() {
        let mut config = TabscanConfig::default();
        config.confidence.green_threshold = 0.90;
        config.confidence.yellow_threshold = 0.95;
        let diag = CollectingDiagnostics::new();

        let pipeline = TablePipeline::new(&config, &diag).unwrap();

        assert_eq!(pipeline.thresholds().green(), 0.95);
        assert!(diag
            .warnings()
            .contains(&Warning::ThresholdsClamped { green: 0.90, yellow: 0.95 }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = TabscanConfig::default();
        config.layout.y_threshold = f32::NAN;
        assert!(matches!(
            TablePipeline::new(&config, &CollectingDiagnostics::new()),
            Err(TabscanError::Config(_))
        ));
    }
}
