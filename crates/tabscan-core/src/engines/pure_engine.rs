//! In-process OCR using `pure-onnx-ocr` (pure Rust, no external runtime).

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::models::detection::Point;

use super::{RawDetection, RawScore};

/// Runs PaddleOCR ONNX models and yields raw detections.
pub struct OnnxEngine {
    engine: pure_onnx_ocr::engine::OcrEngine,
}

impl OnnxEngine {
    /// Create an engine from `det.onnx`, `rec.onnx` and `dict.txt` in a directory.
    pub fn from_dir(model_dir: &Path) -> Result<Self, EngineError> {
        let det_path = model_dir.join("det.onnx");
        let rec_path = model_dir.join("rec.onnx");
        let dict_path = model_dir.join("dict.txt");

        let engine = pure_onnx_ocr::engine::OcrEngineBuilder::new()
            .det_model_path(&det_path)
            .rec_model_path(&rec_path)
            .dictionary_path(&dict_path)
            .build()
            .map_err(|e| EngineError::Model(format!("pure-onnx-ocr: {}", e)))?;

        info!("Loaded pure-onnx-ocr engine from {}", model_dir.display());

        Ok(Self { engine })
    }

    /// Run detection and recognition on an image.
    ///
    /// Polygons keep their first four exterior points; anything shorter is
    /// passed through and rejected by normalization.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, EngineError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let results = self
            .engine
            .run_from_image(image)
            .map_err(|e| EngineError::Model(format!("pure-onnx-ocr: {}", e)))?;

        let raws: Vec<RawDetection> = results
            .iter()
            .map(|r| {
                let points = r
                    .bounding_box
                    .exterior()
                    .coords()
                    .take(4)
                    .map(|c| Point::new(c.x as f32, c.y as f32))
                    .collect();
                RawDetection::quad(
                    points,
                    r.text.replace("[UNK]", " "),
                    Some(RawScore::Fraction(r.confidence as f32)),
                )
            })
            .collect();

        debug!(
            "pure-onnx-ocr found {} regions in {}x{} image in {}ms",
            raws.len(),
            width,
            height,
            start.elapsed().as_millis()
        );

        Ok(raws)
    }
}
