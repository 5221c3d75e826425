use ndarray::{Array4, Axis};
use rand::Rng;
use std::sync::Arc;

use crate::config::{ClassifierBackend, ClassifierConfig};
use crate::vision::PreprocessConfig;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("unexpected input shape: {0}")]
    Shape(String),
    #[error("inference backend error: {0}")]
    Backend(String),
}

/// Seam between the freshness pipeline and a model runtime.
///
/// `infer` takes a `[1, 3, H, W]` batch and returns one score per class. It
/// must not mutate model weights; implementations document whether calls are
/// reentrant or serialized internally.
pub trait Classifier: Send + Sync {
    fn name(&self) -> &str;
    fn infer(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError>;
}

/// Builds the classifier selected in the configuration.
pub fn load_classifier(
    config: &ClassifierConfig,
    preprocess: &PreprocessConfig,
) -> Result<Arc<dyn Classifier>, InferenceError> {
    match config.backend {
        ClassifierBackend::Brightness => Ok(Arc::new(BrightnessClassifier::new(
            preprocess.clone(),
            config.jitter,
        ))),
        ClassifierBackend::Torchscript => load_torchscript(config),
    }
}

#[cfg(feature = "torch")]
fn load_torchscript(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, InferenceError> {
    let path = config
        .model_path
        .as_deref()
        .ok_or_else(|| InferenceError::Backend("classifier.model_path is not set".into()))?;
    let classifier = super::torch::TorchClassifier::load(path, config.device)?;
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "torch"))]
fn load_torchscript(_config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, InferenceError> {
    Err(InferenceError::Backend(
        "torchscript backend requested but the binary was built without the `torch` feature".into(),
    ))
}

/// Rule-based estimator that scores `[fresh, average, spoiled]` from the mean
/// brightness of the image.
///
/// Stateless, so concurrent calls need no locking.
pub struct BrightnessClassifier {
    preprocess: PreprocessConfig,
    jitter: f32,
}

impl BrightnessClassifier {
    pub fn new(preprocess: PreprocessConfig, jitter: f32) -> Self {
        Self { preprocess, jitter }
    }

    /// Mean intensity on the 0-255 scale over all channels.
    fn brightness(&self, batch: &Array4<f32>) -> Result<f32, InferenceError> {
        let shape = batch.shape();
        if shape.len() != 4 || shape[0] != 1 || shape[1] != 3 {
            return Err(InferenceError::Shape(format!("{shape:?}, expected [1, 3, H, W]")));
        }

        let image = batch.index_axis(Axis(0), 0);
        let mut total = 0.0;
        for (c, plane) in image.axis_iter(Axis(0)).enumerate() {
            let mean = plane
                .mean()
                .ok_or_else(|| InferenceError::Shape("input tensor has no pixels".into()))?;
            total += self.preprocess.restore_intensity(mean, c);
        }
        Ok(total / 3.0)
    }
}

impl Classifier for BrightnessClassifier {
    fn name(&self) -> &str {
        "brightness"
    }

    fn infer(&self, batch: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
        let brightness = self.brightness(batch)?;
        let mut scores = if brightness > 150.0 {
            vec![0.8, 0.15, 0.05]
        } else if brightness > 100.0 {
            vec![0.3, 0.5, 0.2]
        } else {
            vec![0.1, 0.3, 0.6]
        };
        log::debug!("brightness {brightness:.1} -> base scores {scores:?}");

        if self.jitter > 0.0 {
            let mut rng = rand::rng();
            for s in scores.iter_mut() {
                *s = (*s + rng.random_range(-self.jitter..=self.jitter)).clamp(0.0, 1.0);
            }
            let total: f32 = scores.iter().sum();
            if total > 0.0 {
                scores.iter_mut().for_each(|s| *s /= total);
            }
        }

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::test_support::solid_png;
    use crate::vision::{batch, decode, preprocess};

    fn scores_for(rgb: [u8; 3], jitter: f32) -> Vec<f32> {
        let config = PreprocessConfig::default();
        let image = decode(&solid_png(300, 300, rgb)).unwrap();
        let input = batch(preprocess(&image, &config));
        BrightnessClassifier::new(config, jitter).infer(&input).unwrap()
    }

    fn argmax(scores: &[f32]) -> usize {
        let mut best = 0;
        for (i, &s) in scores.iter().enumerate() {
            if s > scores[best] {
                best = i;
            }
        }
        best
    }

    #[test]
    fn bright_image_leans_fresh() {
        assert_eq!(argmax(&scores_for([200, 200, 200], 0.0)), 0);
    }

    #[test]
    fn mid_gray_leans_average() {
        assert_eq!(scores_for([128, 128, 128], 0.0), vec![0.3, 0.5, 0.2]);
    }

    #[test]
    fn dark_image_leans_spoiled() {
        assert_eq!(argmax(&scores_for([50, 50, 50], 0.0)), 2);
    }

    #[test]
    fn jittered_scores_stay_normalized() {
        let scores = scores_for([200, 200, 200], 0.1);
        let total: f32 = scores.iter().sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn rejects_unbatched_input() {
        let classifier = BrightnessClassifier::new(PreprocessConfig::default(), 0.0);
        let input = Array4::<f32>::zeros((2, 3, 4, 4));
        assert!(matches!(classifier.infer(&input), Err(InferenceError::Shape(_))));
    }

    #[cfg(not(feature = "torch"))]
    #[test]
    fn torchscript_backend_needs_feature() {
        let config = ClassifierConfig {
            backend: ClassifierBackend::Torchscript,
            ..Default::default()
        };
        assert!(load_classifier(&config, &PreprocessConfig::default()).is_err());
    }
}
