use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::freshness::{load_classifier, FreshnessService};
use crate::ocr::{OcrEngine, OcrService, PaddleServingEngine};

/// Services shared by every request worker.
///
/// Built once in `main`, read-only afterwards. An engine that fails to
/// initialize leaves its endpoint answering "not ready" for the life of the
/// process.
pub struct AppState {
    pub freshness: FreshnessService,
    pub ocr: OcrService,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(freshness: FreshnessService, ocr: OcrService, max_upload_bytes: usize) -> Self {
        Self {
            freshness,
            ocr,
            max_upload_bytes,
        }
    }

    pub async fn initialize(config: &AppConfig) -> Result<Self, ConfigError> {
        let labels = config.label_set()?;
        let preprocess = config.freshness.preprocess.clone();

        let classifier = match load_classifier(&config.classifier, &preprocess) {
            Ok(classifier) => {
                log::info!(
                    "Freshness classifier '{}' ready with labels {:?}",
                    classifier.name(),
                    labels.as_slice()
                );
                Some(classifier)
            }
            Err(e) => {
                log::error!("Freshness classifier failed to initialize: {e}");
                None
            }
        };

        let engine = match PaddleServingEngine::connect(&config.ocr).await {
            Ok(engine) => {
                log::info!("OCR engine '{}' ready at {}", engine.name(), engine.endpoint());
                Some(Arc::new(engine) as Arc<dyn OcrEngine>)
            }
            Err(e) => {
                log::error!("OCR engine failed to initialize: {e}");
                None
            }
        };

        Ok(Self::new(
            FreshnessService::new(classifier, labels, preprocess),
            OcrService::new(engine),
            config.server.max_upload_bytes,
        ))
    }

    pub fn shutdown(self) {
        log::info!(
            "Releasing classifier {:?} and OCR engine {:?}",
            self.freshness.classifier_name(),
            self.ocr.engine_name()
        );
    }
}
