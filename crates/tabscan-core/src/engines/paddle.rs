//! PaddleOCR result adapter.
//!
//! PaddleOCR returns one list per page, each holding records of the form
//! `[[[x1, y1], [x2, y2], [x3, y3], [x4, y4]], [text, score]]`. Pages with
//! no text come back as `null`. A flat list of records (single page, older
//! releases) is accepted too.

use serde_json::Value;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::EngineError;

use super::{json_points, json_score, DetectionReader, EngineKind, RawDetection};

/// Reads PaddleOCR JSON output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PaddleReader;

impl DetectionReader for PaddleReader {
    fn engine(&self) -> EngineKind {
        EngineKind::Paddle
    }

    fn read(
        &self,
        payload: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<RawDetection>, EngineError> {
        let root: Value = serde_json::from_str(payload)?;
        let top = match &root {
            Value::Array(items) => items,
            Value::Null => return Ok(Vec::new()),
            _ => {
                return Err(EngineError::Shape(
                    "expected a list of pages or records".to_string(),
                ))
            }
        };

        let mut raws = Vec::new();
        let mut index = 0usize;

        for item in top {
            if is_record(item) {
                push_record(item, index, &mut raws, diagnostics);
                index += 1;
                continue;
            }

            match item {
                Value::Null => {}
                Value::Array(page) => {
                    for record in page {
                        push_record(record, index, &mut raws, diagnostics);
                        index += 1;
                    }
                }
                other => {
                    diagnostics.warn(Warning::SkippedRecord {
                        index,
                        detail: format!("unexpected page value: {}", other),
                    });
                    index += 1;
                }
            }
        }

        Ok(raws)
    }
}

/// A record is a `[box, [text, ...]]` pair whose box starts with a point
/// rather than a nested box; a page is a list of such pairs.
fn is_record(value: &Value) -> bool {
    let Some([bbox, recognition]) = value.as_array().map(Vec::as_slice) else {
        return false;
    };
    let starts_with_point = bbox
        .get(0)
        .and_then(Value::as_array)
        .is_some_and(|point| !point.iter().any(Value::is_array));

    starts_with_point && recognition.get(0).is_some_and(Value::is_string)
}

fn push_record(
    record: &Value,
    index: usize,
    raws: &mut Vec<RawDetection>,
    diagnostics: &dyn Diagnostics,
) {
    match parse_record(record) {
        Some(raw) => raws.push(raw),
        None => diagnostics.warn(Warning::SkippedRecord {
            index,
            detail: "expected [box, [text, score]]".to_string(),
        }),
    }
}

fn parse_record(record: &Value) -> Option<RawDetection> {
    let parts = record.as_array()?;
    if parts.len() != 2 {
        return None;
    }

    let points = json_points(&parts[0])?;
    let recognition = parts[1].as_array()?;
    let text = recognition.first()?.as_str()?;
    let score = json_score(recognition.get(1));

    Some(RawDetection::quad(points, text, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::engines::{normalize_all, RawRegion, RawScore};
    use crate::error::MalformedDetection;
    use crate::models::detection::Point;

    const PAGED: &str = r#"[[
        [[[10, 20], [110, 20], [110, 40], [10, 40]], ["Invoice", 0.998]],
        [[[150, 22], [250, 22], [250, 42], [150, 42]], ["No. 17", 0.91]]
    ], null]"#;

    #[test]
    fn test_reads_paged_output() {
        let diag = CollectingDiagnostics::new();
        let raws = PaddleReader.read(PAGED, &diag).unwrap();

        assert_eq!(raws.len(), 2);
        assert_eq!(raws[0].text, "Invoice");
        assert_eq!(raws[0].score, Some(RawScore::Fraction(0.998)));
        assert_eq!(
            raws[1].region,
            RawRegion::Quad(vec![
                Point::new(150.0, 22.0),
                Point::new(250.0, 22.0),
                Point::new(250.0, 42.0),
                Point::new(150.0, 42.0),
            ])
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn test_reads_flat_output() {
        let payload = r#"[[[[0, 0], [4, 0], [4, 2], [0, 2]], ["a", 0.5]]]"#;
        let raws = PaddleReader.read(payload, &CollectingDiagnostics::new()).unwrap();
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].text, "a");
    }

    #[test]
    fn test_skips_garbage_records() {
        let payload = r#"[[
            [[[0, 0], [4, 0], [4, 2], [0, 2]], ["ok", 0.9]],
            ["no box"],
            [[[0, 0], [4, 0], [4, 2]], ["three corners", 0.9]],
            [[[0, 0], [4, 0], [4, 2], [0, 2]], ["no score", null]]
        ]]"#;
        let diag = CollectingDiagnostics::new();
        let raws = PaddleReader.read(payload, &diag).unwrap();
        assert_eq!(raws.len(), 3);
        assert_eq!(diag.rejected_count(), 1);

        let detections = normalize_all(raws, &diag);
        assert_eq!(detections.len(), 1);
        assert!(diag.warnings().iter().any(|w| matches!(
            w,
            Warning::Rejected {
                reason: MalformedDetection::RegionPoints(3),
                ..
            }
        )));
        assert!(diag.warnings().iter().any(|w| matches!(
            w,
            Warning::Rejected {
                reason: MalformedDetection::MissingConfidence,
                ..
            }
        )));
    }

    #[test]
    fn test_flat_record_with_bad_point_is_one_skip() {
        let payload = r#"[
            [[["a", 1], [4, 0], [4, 2], [0, 2]], ["bad corner", 0.9]],
            [[[0, 0], [4, 0], [4, 2], [0, 2]], ["ok", 0.9]]
        ]"#;
        let diag = CollectingDiagnostics::new();
        let raws = PaddleReader.read(payload, &diag).unwrap();

        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].text, "ok");
        assert!(matches!(
            diag.warnings().as_slice(),
            [Warning::SkippedRecord { index: 0, .. }]
        ));
    }

    #[test]
    fn test_null_result_is_empty() {
        let raws = PaddleReader.read("null", &CollectingDiagnostics::new()).unwrap();
        assert!(raws.is_empty());
        assert!(PaddleReader.read("{}", &CollectingDiagnostics::new()).is_err());
        assert!(PaddleReader.read("not json", &CollectingDiagnostics::new()).is_err());
    }
}
