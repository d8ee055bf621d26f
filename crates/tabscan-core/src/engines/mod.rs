//! Adapters from engine-specific OCR output to uniform detections.
//!
//! Each upstream engine gets a [`DetectionReader`] that only knows how to
//! pull `(region, text, score)` triples out of that engine's serialized
//! output. Everything after [`normalize`] is engine independent.

mod easyocr;
mod paddle;
#[cfg(feature = "onnx")]
mod pure_engine;
mod tesseract;

pub use easyocr::EasyOcrReader;
pub use paddle::PaddleReader;
#[cfg(feature = "onnx")]
pub use pure_engine::OnnxEngine;
pub use tesseract::TesseractReader;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{EngineError, MalformedDetection};
use crate::models::detection::{Detection, Point};

/// Region geometry as an engine reports it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRegion {
    /// Free corner points, expected to be exactly four.
    Quad(Vec<Point>),

    /// Axis-aligned box.
    Box {
        left: f32,
        top: f32,
        width: f32,
        height: f32,
    },
}

/// Score as an engine reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawScore {
    /// Already in [0, 1].
    Fraction(f32),

    /// In [0, 100].
    Percent(f32),

    /// The engine explicitly reported "no confidence".
    Unscored,
}

/// One engine detection before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub region: RawRegion,
    pub text: String,
    /// `None` when the engine omitted the score entirely.
    pub score: Option<RawScore>,
}

impl RawDetection {
    pub fn quad(points: Vec<Point>, text: impl Into<String>, score: Option<RawScore>) -> Self {
        Self {
            region: RawRegion::Quad(points),
            text: text.into(),
            score,
        }
    }

    pub fn boxed(
        left: f32,
        top: f32,
        width: f32,
        height: f32,
        text: impl Into<String>,
        score: Option<RawScore>,
    ) -> Self {
        Self {
            region: RawRegion::Box {
                left,
                top,
                width,
                height,
            },
            text: text.into(),
            score,
        }
    }
}

/// Validate one raw detection and convert it to a [`Detection`].
pub fn normalize(raw: RawDetection) -> Result<Detection, MalformedDetection> {
    let text = raw.text.trim();
    if text.is_empty() {
        return Err(MalformedDetection::EmptyText);
    }

    let confidence = normalize_score(raw.score)?;

    match raw.region {
        RawRegion::Quad(points) => {
            let region: [Point; 4] = points
                .try_into()
                .map_err(|p: Vec<Point>| MalformedDetection::RegionPoints(p.len()))?;
            if !region.iter().all(Point::is_finite) {
                return Err(MalformedDetection::NonFinite);
            }
            Ok(Detection::from_region(region, text, confidence))
        }
        RawRegion::Box {
            left,
            top,
            width,
            height,
        } => {
            if ![left, top, width, height].iter().all(|v| v.is_finite()) {
                return Err(MalformedDetection::NonFinite);
            }
            Ok(Detection::from_box(left, top, width, height, text, confidence))
        }
    }
}

fn normalize_score(score: Option<RawScore>) -> Result<f32, MalformedDetection> {
    let value = match score {
        None => return Err(MalformedDetection::MissingConfidence),
        Some(RawScore::Unscored) => return Ok(0.0),
        Some(RawScore::Fraction(v)) => v,
        Some(RawScore::Percent(v)) => v / 100.0,
    };

    if !value.is_finite() {
        return Err(MalformedDetection::NonFinite);
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(MalformedDetection::ConfidenceOutOfRange(value));
    }
    Ok(value)
}

/// Normalize a batch, reporting and dropping malformed detections.
pub fn normalize_all<I>(raws: I, diagnostics: &dyn Diagnostics) -> Vec<Detection>
where
    I: IntoIterator<Item = RawDetection>,
{
    let mut detections = Vec::new();
    let mut rejected = 0usize;

    for (index, raw) in raws.into_iter().enumerate() {
        match normalize(raw) {
            Ok(detection) => detections.push(detection),
            Err(reason) => {
                rejected += 1;
                diagnostics.warn(Warning::Rejected { index, reason });
            }
        }
    }

    debug!(
        "Normalized {} detections, rejected {}",
        detections.len(),
        rejected
    );

    detections
}

/// Reads one engine's serialized output.
pub trait DetectionReader {
    /// Which engine this reader understands.
    fn engine(&self) -> EngineKind;

    /// Extract raw detections from a payload.
    ///
    /// Records with the wrong shape are reported and skipped; only a payload
    /// that cannot be read at all is an error.
    fn read(
        &self,
        payload: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<RawDetection>, EngineError>;
}

/// Upstream OCR engines with a serialized output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// PaddleOCR `ocr()` result as JSON.
    Paddle,
    /// EasyOCR `readtext()` result as JSON.
    EasyOcr,
    /// Tesseract `tsv` output.
    Tesseract,
}

impl EngineKind {
    /// Get the reader for this engine.
    pub fn reader(&self) -> Box<dyn DetectionReader> {
        match self {
            EngineKind::Paddle => Box::new(PaddleReader),
            EngineKind::EasyOcr => Box::new(EasyOcrReader),
            EngineKind::Tesseract => Box::new(TesseractReader),
        }
    }

    /// Read and normalize a payload in one step.
    pub fn detections(
        &self,
        payload: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<Detection>, EngineError> {
        let raws = self.reader().read(payload, diagnostics)?;
        Ok(normalize_all(raws, diagnostics))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Paddle => "paddle",
            EngineKind::EasyOcr => "easyocr",
            EngineKind::Tesseract => "tesseract",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paddle" | "paddleocr" => Ok(EngineKind::Paddle),
            "easyocr" | "easy" => Ok(EngineKind::EasyOcr),
            "tesseract" | "tsv" => Ok(EngineKind::Tesseract),
            other => Err(EngineError::Shape(format!("unknown engine: {}", other))),
        }
    }
}

/// Read an `[x, y]` JSON point.
pub(crate) fn json_point(value: &serde_json::Value) -> Option<Point> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Some(Point::new(pair[0].as_f64()? as f32, pair[1].as_f64()? as f32))
}

/// Read a list of `[x, y]` JSON points.
pub(crate) fn json_points(value: &serde_json::Value) -> Option<Vec<Point>> {
    value.as_array()?.iter().map(json_point).collect()
}

/// Read a JSON score; `null` and absent values are a missing score.
pub(crate) fn json_score(value: Option<&serde_json::Value>) -> Option<RawScore> {
    value
        .and_then(serde_json::Value::as_f64)
        .map(|v| RawScore::Fraction(v as f32))
}
