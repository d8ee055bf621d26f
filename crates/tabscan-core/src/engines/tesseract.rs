//! Tesseract TSV adapter.
//!
//! Reads the output of `tesseract <image> <base> tsv`. Only word-level rows
//! (level 5) are detections; page, block, paragraph and line rows carry no
//! text and are skipped without a warning. Scores are percentages and `-1`
//! means the engine reported no confidence.

use csv::{ReaderBuilder, StringRecord};

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::EngineError;

use super::{DetectionReader, EngineKind, RawDetection, RawScore};

const WORD_LEVEL: u32 = 5;

/// Reads Tesseract TSV output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TesseractReader;

struct Columns {
    level: Option<usize>,
    left: usize,
    top: usize,
    width: usize,
    height: usize,
    conf: usize,
    text: usize,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, EngineError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| EngineError::Shape(format!("missing TSV column: {}", name)))
        };

        Ok(Self {
            level: find("level"),
            left: require("left")?,
            top: require("top")?,
            width: require("width")?,
            height: require("height")?,
            conf: require("conf")?,
            text: require("text")?,
        })
    }
}

impl DetectionReader for TesseractReader {
    fn engine(&self) -> EngineKind {
        EngineKind::Tesseract
    }

    fn read(
        &self,
        payload: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<RawDetection>, EngineError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .from_reader(payload.as_bytes());

        let columns = Columns::from_headers(reader.headers()?)?;
        let mut raws = Vec::new();

        for (index, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    diagnostics.warn(Warning::SkippedRecord {
                        index,
                        detail: e.to_string(),
                    });
                    continue;
                }
            };

            if let Some(level_col) = columns.level {
                let level = record.get(level_col).and_then(|v| v.trim().parse::<u32>().ok());
                if level.is_some_and(|l| l != WORD_LEVEL) {
                    continue;
                }
            }

            match parse_row(&record, &columns) {
                Some(raw) => raws.push(raw),
                None => diagnostics.warn(Warning::SkippedRecord {
                    index,
                    detail: "unreadable box or confidence".to_string(),
                }),
            }
        }

        Ok(raws)
    }
}

fn parse_row(record: &StringRecord, columns: &Columns) -> Option<RawDetection> {
    let number = |col: usize| record.get(col)?.trim().parse::<f32>().ok();

    let left = number(columns.left)?;
    let top = number(columns.top)?;
    let width = number(columns.width)?;
    let height = number(columns.height)?;

    let score = match record.get(columns.conf).map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let conf = raw.parse::<f32>().ok()?;
            if conf < 0.0 {
                Some(RawScore::Unscored)
            } else {
                Some(RawScore::Percent(conf))
            }
        }
    };

    // Trailing empty text fields may be cut off entirely.
    let text = record.get(columns.text).unwrap_or("");

    Some(RawDetection::boxed(left, top, width, height, text, score))
}
