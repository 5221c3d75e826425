//! Normalization of the result documents returned by PaddleOCR-style engines.
//!
//! Engine versions disagree on the shape of a prediction. Newer pipelines
//! return a list of page objects with a `rec_texts` array; older ones return a
//! list of pages where each page is a list of `[box, [text, confidence]]`
//! lines. Serving deployments additionally wrap pages in a
//! `{"result": {"ocrResults": [{"prunedResult": ...}]}}` envelope.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrSchema {
    NamedField(Vec<String>),
    LegacyNested(Vec<String>),
    Empty,
}

impl OcrSchema {
    pub fn classify(raw: &Value) -> Self {
        let pages = unwrap_serving_envelope(raw);
        let Some(first) = pages.as_array().and_then(|pages| pages.first()) else {
            return OcrSchema::Empty;
        };

        if let Some(texts) = first.get("rec_texts").and_then(Value::as_array) {
            return OcrSchema::NamedField(
                texts.iter().filter_map(Value::as_str).map(String::from).collect(),
            );
        }

        if let Some(lines) = first.as_array() {
            let texts = lines
                .iter()
                .filter_map(|line| line.get(1)?.get(0)?.as_str())
                .map(String::from)
                .collect();
            return OcrSchema::LegacyNested(texts);
        }

        OcrSchema::Empty
    }

    pub fn into_lines(self) -> Vec<String> {
        match self {
            OcrSchema::NamedField(lines) | OcrSchema::LegacyNested(lines) => lines,
            OcrSchema::Empty => Vec::new(),
        }
    }
}

fn unwrap_serving_envelope(raw: &Value) -> Value {
    let Some(results) = raw
        .get("result")
        .and_then(|result| result.get("ocrResults"))
        .and_then(Value::as_array)
    else {
        return raw.clone();
    };

    Value::Array(
        results
            .iter()
            .map(|page| page.get("prunedResult").cloned().unwrap_or(Value::Null))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_lines() -> Vec<String> {
        vec!["Ingredients: water, salt".to_string(), "Best before 2026-12-01".to_string()]
    }

    #[test]
    fn named_field_schema() {
        let raw = json!([{
            "rec_texts": ["Ingredients: water, salt", "Best before 2026-12-01"],
            "rec_scores": [0.98, 0.95],
        }]);
        let schema = OcrSchema::classify(&raw);
        assert!(matches!(schema, OcrSchema::NamedField(_)));
        assert_eq!(schema.into_lines(), two_lines());
    }

    #[test]
    fn legacy_nested_schema() {
        let raw = json!([[
            [[[0, 0], [10, 0], [10, 5], [0, 5]], ["Ingredients: water, salt", 0.98]],
            [[[0, 6], [10, 6], [10, 11], [0, 11]], ["Best before 2026-12-01", 0.95]],
        ]]);
        let schema = OcrSchema::classify(&raw);
        assert!(matches!(schema, OcrSchema::LegacyNested(_)));
        assert_eq!(schema.into_lines(), two_lines());
    }

    #[test]
    fn serving_envelope_is_unwrapped() {
        let raw = json!({
            "logId": "abc",
            "errorCode": 0,
            "result": {"ocrResults": [{"prunedResult": {"rec_texts": ["a", "b"]}}]},
        });
        assert_eq!(
            OcrSchema::classify(&raw),
            OcrSchema::NamedField(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn unexpected_shapes_are_empty() {
        assert_eq!(OcrSchema::classify(&Value::Null), OcrSchema::Empty);
        assert_eq!(OcrSchema::classify(&json!([])), OcrSchema::Empty);
        assert_eq!(OcrSchema::classify(&json!([{"boxes": []}])), OcrSchema::Empty);
        assert_eq!(OcrSchema::classify(&json!("text")), OcrSchema::Empty);
    }

    #[test]
    fn malformed_legacy_lines_are_skipped() {
        let raw = json!([[[[0, 0], ["kept", 0.9]], ["no recognition"], 42]]);
        assert_eq!(OcrSchema::classify(&raw).into_lines(), vec!["kept".to_string()]);
    }
}
