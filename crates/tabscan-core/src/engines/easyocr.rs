//! EasyOCR result adapter.
//!
//! `readtext()` returns `[[[x, y] x4], text, score]` triples. With
//! `output_format="dict"` each record is `{"boxes", "text", "confident"}`
//! instead; both are accepted.

use serde_json::Value;

use crate::diagnostics::{Diagnostics, Warning};
use crate::error::EngineError;

use super::{json_points, json_score, DetectionReader, EngineKind, RawDetection};

/// Reads EasyOCR JSON output.
#[derive(Debug, Default, Clone, Copy)]
pub struct EasyOcrReader;

impl DetectionReader for EasyOcrReader {
    fn engine(&self) -> EngineKind {
        EngineKind::EasyOcr
    }

    fn read(
        &self,
        payload: &str,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Vec<RawDetection>, EngineError> {
        let root: Value = serde_json::from_str(payload)?;
        let records = root
            .as_array()
            .ok_or_else(|| EngineError::Shape("expected a list of records".to_string()))?;

        let mut raws = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let parsed = match record {
                Value::Array(_) => parse_triple(record),
                Value::Object(_) => parse_dict(record),
                _ => None,
            };

            match parsed {
                Some(raw) => raws.push(raw),
                None => diagnostics.warn(Warning::SkippedRecord {
                    index,
                    detail: "expected [box, text, score]".to_string(),
                }),
            }
        }

        Ok(raws)
    }
}

fn parse_triple(record: &Value) -> Option<RawDetection> {
    let parts = record.as_array()?;
    if parts.len() < 2 {
        return None;
    }
    let points = json_points(&parts[0])?;
    let text = parts[1].as_str()?;
    Some(RawDetection::quad(points, text, json_score(parts.get(2))))
}

fn parse_dict(record: &Value) -> Option<RawDetection> {
    let points = json_points(record.get("boxes")?)?;
    let text = record.get("text")?.as_str()?;
    let score = json_score(record.get("confident").or_else(|| record.get("confidence")));
    Some(RawDetection::quad(points, text, score))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::engines::RawScore;

    #[test]
    fn test_reads_triples() {
        let payload = r#"[
            [[[5, 5], [45, 5], [45, 25], [5, 25]], "Item", 0.87],
            [[[60.5, 6], [90, 6], [90, 24], [60.5, 24]], "Price", 0.99]
        ]"#;
        let raws = EasyOcrReader.read(payload, &CollectingDiagnostics::new()).unwrap();

        assert_eq!(raws.len(), 2);
        assert_eq!(raws[1].text, "Price");
        assert_eq!(raws[0].score, Some(RawScore::Fraction(0.87)));
    }

    #[test]
    fn test_reads_dict_records() {
        let payload = r#"[{"boxes": [[0, 0], [2, 0], [2, 2], [0, 2]], "text": "x", "confident": 0.4}]"#;
        let raws = EasyOcrReader.read(payload, &CollectingDiagnostics::new()).unwrap();
        assert_eq!(raws.len(), 1);
        assert_eq!(raws[0].score, Some(RawScore::Fraction(0.4)));
    }

    #[test]
    fn test_skips_malformed_records() {
        let payload = r#"[
            [[[0, 0], [2, 0], [2, 2], [0, 2]], "ok", 0.9],
            42,
            [[[0, "a"]], "bad point", 0.9]
        ]"#;
        let diag = CollectingDiagnostics::new();
        let raws = EasyOcrReader.read(payload, &diag).unwrap();

        assert_eq!(raws.len(), 1);
        assert_eq!(diag.rejected_count(), 2);
    }

    #[test]
    fn test_rejects_non_list_payload() {
        let err = EasyOcrReader
            .read(r#"{"text": "x"}"#, &CollectingDiagnostics::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Shape(_)));
    }
}
