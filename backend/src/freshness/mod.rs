pub mod advisory;
pub mod classifier;
pub mod ranker;
#[cfg(feature = "torch")]
pub mod torch;

use shared::FreshnessResponse;
use std::sync::Arc;

use crate::vision::{self, DecodeError, PreprocessConfig};
pub use advisory::advise;
pub use classifier::{load_classifier, Classifier, InferenceError};
pub use ranker::{rank, LabelSet, RankError, RankedResult};

#[derive(Debug, thiserror::Error)]
pub enum FreshnessError {
    #[error("freshness classifier is not ready")]
    EngineNotReady,
    #[error("image decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("freshness inference failed")]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Rank(#[from] RankError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub ranked: RankedResult,
    pub advice: String,
}

impl From<Assessment> for FreshnessResponse {
    fn from(assessment: Assessment) -> Self {
        let Assessment { ranked, advice } = assessment;
        FreshnessResponse::Success {
            label: ranked.top_label,
            score: ranked.top_score,
            advice,
            all_results: ranked.all_results,
        }
    }
}

/// Freshness pipeline: decode, preprocess, infer, rank, advise.
///
/// A `None` classifier means initialization failed at startup; every call then
/// fails with [`FreshnessError::EngineNotReady`].
pub struct FreshnessService {
    classifier: Option<Arc<dyn Classifier>>,
    labels: LabelSet,
    preprocess: PreprocessConfig,
}

impl FreshnessService {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        labels: LabelSet,
        preprocess: PreprocessConfig,
    ) -> Self {
        Self {
            classifier,
            labels,
            preprocess,
        }
    }

    pub fn classifier_name(&self) -> Option<&str> {
        self.classifier.as_deref().map(|c| c.name())
    }

    /// Scores an image without attaching advice.
    pub fn predict_raw(&self, image: &[u8]) -> Result<RankedResult, FreshnessError> {
        let classifier = self.classifier.as_ref().ok_or(FreshnessError::EngineNotReady)?;

        let decoded = vision::decode(image)?;
        log::debug!("Decoded {}x{} image", decoded.width(), decoded.height());
        let tensor = vision::preprocess(&decoded, &self.preprocess);
        let scores = classifier.infer(&vision::batch(tensor))?;
        Ok(rank(&scores, &self.labels)?)
    }

    pub fn score(&self, image: &[u8]) -> Result<Assessment, FreshnessError> {
        let ranked = self.predict_raw(image)?;
        let advice = advise(&ranked.top_label, ranked.top_score);
        Ok(Assessment { ranked, advice })
    }

    /// Runs [`score`](Self::score) and folds any failure into the error form
    /// of the response.
    pub fn assess(&self, image: &[u8]) -> FreshnessResponse {
        match self.score(image) {
            Ok(assessment) => {
                log::info!(
                    "Freshness: {} ({:.3})",
                    assessment.ranked.top_label,
                    assessment.ranked.top_score
                );
                assessment.into()
            }
            Err(err) => {
                match &err {
                    FreshnessError::Inference(source) => {
                        log::error!("Freshness inference failed: {source:?}")
                    }
                    other => log::error!("Freshness detection failed: {other}"),
                }
                FreshnessResponse::Error {
                    message: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::vision::test_support::solid_png;
    use ndarray::Array4;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Returns fixed scores and counts calls.
    pub(crate) struct FixedClassifier {
        scores: Vec<f32>,
        pub calls: AtomicUsize,
    }

    impl FixedClassifier {
        pub(crate) fn new(scores: &[f32]) -> Arc<Self> {
            Arc::new(Self {
                scores: scores.to_vec(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl Classifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn infer(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(batch.shape(), &[1, 3, 224, 224]);
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.scores.clone())
        }
    }

    struct FailingClassifier;

    impl Classifier for FailingClassifier {
        fn name(&self) -> &str {
            "failing"
        }

        fn infer(&self, _batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Err(InferenceError::Backend("CUDA out of memory at layer 7".into()))
        }
    }

    pub(crate) fn default_labels() -> LabelSet {
        LabelSet::new(["fresh", "average", "spoiled"]).unwrap()
    }

    fn service(classifier: Arc<dyn Classifier>) -> FreshnessService {
        FreshnessService::new(Some(classifier), default_labels(), PreprocessConfig::default())
    }

    #[test]
    fn mid_gray_image_scores_average() {
        let service = service(FixedClassifier::new(&[0.1, 0.7, 0.2]));
        let image = solid_png(300, 300, [128, 128, 128]);

        let assessment = service.score(&image).unwrap();
        assert_eq!(assessment.ranked.top_label, "average");
        assert_eq!(assessment.ranked.top_score, 0.7);
        assert_eq!(assessment.advice, advise("average", 0.95));
        assert!(!assessment.advice.contains(advisory::LOW_CONFIDENCE_CAVEAT));
        assert_eq!(assessment.ranked.all_results.len(), 3);
    }

    #[test]
    fn decode_failure_stops_before_inference() {
        let classifier = FixedClassifier::new(&[0.1, 0.7, 0.2]);
        let service = service(classifier.clone());

        let err = service.score(b"not an image").unwrap_err();
        assert!(matches!(err, FreshnessError::Decode(_)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_classifier_is_not_ready() {
        let service = FreshnessService::new(None, default_labels(), PreprocessConfig::default());
        let image = solid_png(8, 8, [0, 0, 0]);
        assert!(matches!(service.score(&image), Err(FreshnessError::EngineNotReady)));
    }

    #[test]
    fn mismatched_output_is_an_error_response() {
        let service = service(FixedClassifier::new(&[0.5, 0.5]));
        let response = service.assess(&solid_png(8, 8, [0, 0, 0]));
        match response {
            FreshnessResponse::Error { message } => {
                assert!(message.contains("2 scores"), "{message}");
                assert!(message.contains("3 labels"), "{message}");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn inference_details_are_not_echoed() {
        let service = service(Arc::new(FailingClassifier));
        match service.assess(&solid_png(8, 8, [0, 0, 0])) {
            FreshnessResponse::Error { message } => {
                assert_eq!(message, "freshness inference failed");
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn success_response_carries_sorted_results() {
        let service = service(FixedClassifier::new(&[0.2, 0.1, 0.7]));
        match service.assess(&solid_png(40, 20, [10, 10, 10])) {
            FreshnessResponse::Success {
                label,
                score,
                advice,
                all_results,
            } => {
                assert_eq!(label, "spoiled");
                assert_eq!(score, 0.7);
                assert_eq!(advice, advise("spoiled", 0.7));
                let scores: Vec<f32> = all_results.iter().map(|r| r.score).collect();
                assert_eq!(scores, vec![0.7, 0.2, 0.1]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
