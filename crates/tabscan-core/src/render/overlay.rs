//! Detection overlay for visual audit.

use std::path::{Path, PathBuf};

use ab_glyph::FontVec;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use tracing::info;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::TabscanError;
use crate::models::config::OverlayConfig;
use crate::models::detection::Detection;

use super::{font::load_font, save_image};

const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

const LABEL_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// How detections are drawn.
pub struct OverlayStyle {
    /// Label font. Labels are skipped when `None`.
    pub font: Option<FontVec>,
    pub font_scale: f32,
    pub line_thickness: u32,
    /// Pixels between the label and the region's first corner.
    pub label_offset: i32,
}

impl OverlayStyle {
    /// Build a style from configuration, loading the font.
    pub fn from_config(config: &OverlayConfig, diagnostics: &dyn Diagnostics) -> Self {
        let font = load_font(config.font_path.as_deref());
        if font.is_none() {
            diagnostics.warn(Warning::FontUnavailable);
        }

        Self {
            font,
            font_scale: config.font_scale,
            line_thickness: config.line_thickness.max(1),
            label_offset: config.label_offset,
        }
    }

    /// Outlines only, no labels.
    pub fn without_font() -> Self {
        let config = OverlayConfig::default();
        Self {
            font: None,
            font_scale: config.font_scale,
            line_thickness: config.line_thickness,
            label_offset: config.label_offset,
        }
    }
}

/// Label drawn above each region.
pub fn label(detection: &Detection) -> String {
    format!("{} ({:.2})", detection.text, detection.confidence)
}

/// Draw every detection's outline and label on a copy of `image`.
///
/// Confidence only appears in the label text; outline and label colors are
/// fixed.
pub fn draw_overlay(
    image: &DynamicImage,
    detections: &[Detection],
    style: &OverlayStyle,
    diagnostics: &dyn Diagnostics,
) -> RgbImage {
    let mut canvas = image.to_rgb8();

    for (index, detection) in detections.iter().enumerate() {
        if !detection.region.iter().all(|p| p.is_finite()) {
            diagnostics.warn(Warning::OverlaySkipped {
                index,
                detail: "non-finite region".to_string(),
            });
            continue;
        }

        let region = &detection.region;
        for i in 0..region.len() {
            let a = region[i];
            let b = region[(i + 1) % region.len()];
            for t in 0..style.line_thickness {
                let t = t as f32;
                draw_line_segment_mut(&mut canvas, (a.x + t, a.y), (b.x + t, b.y), OUTLINE_COLOR);
                draw_line_segment_mut(&mut canvas, (a.x, a.y + t), (b.x, b.y + t), OUTLINE_COLOR);
            }
        }

        if let Some(ref font) = style.font {
            let x = region[0].x as i32;
            let y = region[0].y as i32 - style.label_offset;
            draw_text_mut(
                &mut canvas,
                LABEL_COLOR,
                x,
                y,
                style.font_scale,
                font,
                &label(detection),
            );
        }
    }

    canvas
}

/// Load `source`, draw the overlay and save it to `output`.
pub fn render_overlay(
    source: &Path,
    detections: &[Detection],
    output: &Path,
    style: &OverlayStyle,
    diagnostics: &dyn Diagnostics,
) -> Result<PathBuf, TabscanError> {
    let image = image::open(source)?;
    let canvas = draw_overlay(&image, detections, style, diagnostics);
    save_image(canvas, output)?;

    info!("Image with bounding boxes saved at: {}", output.display());
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::models::detection::Point;

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])))
    }

    #[test]
    fn test_label_format() {
        let detection = Detection::from_box(0.0, 0.0, 10.0, 10.0, "Total", 0.956);
        assert_eq!(label(&detection), "Total (0.96)");
    }

    #[test]
    fn test_outline_is_drawn_in_place() {
        let image = blank(100, 60);
        let detections = vec![Detection::from_box(10.0, 20.0, 50.0, 20.0, "A", 0.9)];
        let canvas = draw_overlay(
            &image,
            &detections,
            &OverlayStyle::without_font(),
            &CollectingDiagnostics::new(),
        );

        assert_eq!(canvas.dimensions(), (100, 60));
        assert_eq!(*canvas.get_pixel(30, 20), OUTLINE_COLOR);
        assert_eq!(*canvas.get_pixel(10, 30), OUTLINE_COLOR);
        // Interior untouched.
        assert_eq!(*canvas.get_pixel(30, 30), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_non_finite_region_is_skipped() {
        let mut detection = Detection::from_box(0.0, 0.0, 10.0, 10.0, "x", 0.5);
        detection.region[2] = Point::new(f32::NAN, 3.0);
        let diag = CollectingDiagnostics::new();

        draw_overlay(&blank(20, 20), &[detection], &OverlayStyle::without_font(), &diag);

        assert!(matches!(
            diag.warnings().as_slice(),
            [Warning::OverlaySkipped { index: 0, .. }]
        ));
    }

    #[test]
    fn test_render_overlay_round_trip_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("scan.png");
        blank(80, 40).save(&source).unwrap();
        let detections = vec![Detection::from_box(5.0, 25.0, 30.0, 10.0, "x", 0.5)];
        let style = OverlayStyle::without_font();
        let diag = CollectingDiagnostics::new();

        let first = dir.path().join("a.png");
        let second = dir.path().join("b.png");
        render_overlay(&source, &detections, &first, &style, &diag).unwrap();
        render_overlay(&source, &detections, &second, &style, &diag).unwrap();

        assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
        assert_eq!(image::open(&first).unwrap().width(), 80);
    }

    #[test]
    fn test_missing_source_is_an_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render_overlay(
            &dir.path().join("missing.png"),
            &[],
            &dir.path().join("out.png"),
            &OverlayStyle::without_font(),
            &CollectingDiagnostics::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TabscanError::Image(_)));
    }
}
