use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// Body of `POST /api/freshness`.
///
/// The success variant carries the top prediction and every label sorted by
/// descending score; the error variant only a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FreshnessResponse {
    Success {
        label: String,
        score: f32,
        advice: String,
        all_results: Vec<LabelScore>,
    },
    Error {
        message: String,
    },
}

impl FreshnessResponse {
    pub fn status(&self) -> ResponseStatus {
        match self {
            FreshnessResponse::Success { .. } => ResponseStatus::Success,
            FreshnessResponse::Error { .. } => ResponseStatus::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == ResponseStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

/// One entry of a request validation failure, e.g. a missing form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "type")]
    pub kind: String,
    pub loc: Vec<String>,
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub detail: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn missing_field(field: &str) -> Self {
        Self {
            detail: vec![ValidationIssue {
                kind: "missing".into(),
                loc: vec!["body".into(), field.into()],
                msg: "Field required".into(),
            }],
        }
    }
}
