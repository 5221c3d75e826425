use actix_web::web::Bytes;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::future::{BoxFuture, FutureExt};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use super::OcrError;
use crate::config::OcrConfig;

/// Seam to an OCR engine: encoded image in, raw result document out.
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;
    fn predict(&self, image: Bytes) -> BoxFuture<'_, Result<Value, OcrError>>;
}

/// Client for a PaddleOCR serving endpoint.
///
/// `reqwest::Client` is internally reference counted and safe to share, so
/// concurrent requests go out in parallel over one connection pool.
pub struct PaddleServingEngine {
    client: reqwest::Client,
    endpoint: Url,
}

impl PaddleServingEngine {
    /// Picks the first configured endpoint that accepts connections.
    pub async fn connect(config: &OcrConfig) -> Result<Self, OcrError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::Engine(format!("building HTTP client: {e}")))?;

        let mut last_error = None;
        for endpoint in &config.endpoints {
            match probe(&client, endpoint, config.probe).await {
                Ok(()) => {
                    return Ok(Self {
                        client,
                        endpoint: endpoint.clone(),
                    });
                }
                Err(e) => {
                    log::warn!("OCR endpoint {endpoint} unavailable, trying next: {e}");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| OcrError::Engine("no OCR endpoints configured".into())))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

async fn probe(client: &reqwest::Client, endpoint: &Url, enabled: bool) -> Result<(), OcrError> {
    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(OcrError::Engine(format!("unsupported scheme in {endpoint}")));
    }
    if !enabled {
        return Ok(());
    }

    // Any HTTP answer, even 405 for a GET on a POST route, proves the server is up.
    client
        .get(endpoint.clone())
        .send()
        .await
        .map(|_| ())
        .map_err(|e| OcrError::Engine(e.to_string()))
}

impl OcrEngine for PaddleServingEngine {
    fn name(&self) -> &str {
        "paddle-serving"
    }

    fn predict(&self, image: Bytes) -> BoxFuture<'_, Result<Value, OcrError>> {
        async move {
            let body = json!({
                "file": STANDARD.encode(&image),
                "fileType": 1,
            });

            let response = self
                .client
                .post(self.endpoint.clone())
                .json(&body)
                .send()
                .await
                .map_err(|e| OcrError::Engine(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(OcrError::Engine(format!("engine answered HTTP {status}")));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| OcrError::Engine(format!("invalid engine response: {e}")))
        }
        .boxed()
    }
}
