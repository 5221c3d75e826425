use shared::LabelScore;
use std::collections::HashSet;

/// Ordered, non-empty list of unique freshness labels.
///
/// Position `i` names the classifier's output `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet(Vec<String>);

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LabelSetError {
    #[error("label set is empty")]
    Empty,
    #[error("duplicate label: {0}")]
    Duplicate(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RankError {
    #[error("classifier produced {scores} scores but {labels} labels are configured")]
    LabelMismatch { scores: usize, labels: usize },
}

impl LabelSet {
    pub fn new<I, S>(labels: I) -> Result<Self, LabelSetError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(LabelSetError::Empty);
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(LabelSetError::Duplicate(label.clone()));
            }
        }
        Ok(Self(labels))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankedResult {
    pub top_label: String,
    pub top_score: f32,
    /// Every label, highest score first.
    pub all_results: Vec<LabelScore>,
}

/// NaN ranks below every real score.
fn sort_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

pub fn rank(scores: &[f32], labels: &LabelSet) -> Result<RankedResult, RankError> {
    if scores.len() != labels.len() {
        return Err(RankError::LabelMismatch {
            scores: scores.len(),
            labels: labels.len(),
        });
    }

    let mut all_results: Vec<LabelScore> = labels
        .as_slice()
        .iter()
        .zip(scores)
        .map(|(label, &score)| LabelScore {
            label: label.clone(),
            score,
        })
        .collect();

    // Stable: equal scores keep label-set order, so the first maximum leads.
    all_results.sort_by(|a, b| sort_key(b.score).total_cmp(&sort_key(a.score)));

    let top = &all_results[0];
    Ok(RankedResult {
        top_label: top.label.clone(),
        top_score: top.score,
        all_results,
    })
}
