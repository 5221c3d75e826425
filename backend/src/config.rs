use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::freshness::LabelSet;
use crate::vision::PreprocessConfig;

pub const CONFIG_ENV: &str = "FRESHLENS_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/freshlens.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub freshness: FreshnessConfig,
    pub classifier: ClassifierConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: usize,
    pub cors: bool,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8081,
            max_upload_bytes: 10 * 1024 * 1024,
            cors: true,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FreshnessConfig {
    pub labels: Vec<String>,
    pub preprocess: PreprocessConfig,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            labels: vec!["fresh".into(), "average".into(), "spoiled".into()],
            preprocess: PreprocessConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackend {
    Torchscript,
    #[default]
    Brightness,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    Cpu,
    Cuda,
    #[default]
    Auto,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    pub model_path: Option<PathBuf>,
    pub device: DeviceChoice,
    /// Uniform noise added to brightness scores; 0 keeps them deterministic.
    pub jitter: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Tried in order at startup; the first reachable one is used.
    pub endpoints: Vec<Url>,
    pub timeout_secs: u64,
    pub probe: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            timeout_secs: 30,
            probe: true,
        }
    }
}

impl AppConfig {
    /// Reads `$FRESHLENS_CONFIG` (or the default path when present), applies
    /// environment overrides and validates the result.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            Err(_) => {
                log::info!("No config file found, using built-in defaults");
                Self::default()
            }
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Loading config from {}", path.display());
        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(path) = lookup("FRESHLENS_MODEL_PATH") {
            self.classifier.model_path = Some(PathBuf::from(path));
        }
        if let Some(endpoint) = lookup("FRESHLENS_OCR_ENDPOINT") {
            let url = Url::parse(&endpoint).map_err(|e| {
                ConfigError::Invalid(format!("FRESHLENS_OCR_ENDPOINT {endpoint}: {e}"))
            })?;
            self.ocr.endpoints.insert(0, url);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.label_set()?;
        self.freshness.preprocess.validate()?;

        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid("server.max_upload_bytes must be greater than 0".into()));
        }
        if self.server.workers == Some(0) {
            return Err(ConfigError::Invalid("server.workers must be greater than 0".into()));
        }
        if !(0.0..1.0).contains(&self.classifier.jitter) {
            return Err(ConfigError::Invalid(format!(
                "classifier.jitter must be in [0, 1), got {}",
                self.classifier.jitter
            )));
        }
        if self.classifier.backend == ClassifierBackend::Torchscript
            && self.classifier.model_path.is_none()
        {
            return Err(ConfigError::Invalid(
                "classifier.model_path is required for the torchscript backend".into(),
            ));
        }
        Ok(())
    }

    pub fn label_set(&self) -> Result<LabelSet, ConfigError> {
        LabelSet::new(self.freshness.labels.iter().cloned())
            .map_err(|e| ConfigError::Invalid(format!("freshness.labels: {e}")))
    }
}
