pub mod engine;
pub mod schema;

use actix_web::web::Bytes;
use std::sync::Arc;

use crate::vision::{self, DecodeError};
pub use engine::{OcrEngine, PaddleServingEngine};
pub use schema::OcrSchema;

#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("OCR engine not ready")]
    EngineNotReady,
    #[error("image decoding failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// Label text recognition on top of an [`OcrEngine`].
///
/// An engine that failed to come up at startup stays absent; requests then
/// fail with [`OcrError::EngineNotReady`] instead of retrying initialization.
pub struct OcrService {
    engine: Option<Arc<dyn OcrEngine>>,
}

impl OcrService {
    pub fn new(engine: Option<Arc<dyn OcrEngine>>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.engine.as_deref().map(|e| e.name())
    }

    /// Recognized lines in reading order.
    pub async fn recognize(&self, image: Bytes) -> Result<Vec<String>, OcrError> {
        let Some(engine) = &self.engine else {
            log::error!("OCR engine was not initialized, cannot run OCR");
            return Err(OcrError::EngineNotReady);
        };

        vision::decode(&image)?;
        let raw = engine.predict(image).await?;

        let schema = OcrSchema::classify(&raw);
        if schema == OcrSchema::Empty {
            log::warn!("OCR result is empty or has an unexpected shape: {raw}");
        }
        let lines = schema.into_lines();
        log::info!("OCR finished, recognized {} lines", lines.len());
        Ok(lines)
    }

    pub async fn read_text(&self, image: Bytes) -> Result<String, OcrError> {
        Ok(self.recognize(image).await?.join("\n"))
    }
}
