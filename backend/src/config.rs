use serde::{Deserialize, Serialize};
use shared::SkinType;
use std::collections::HashSet;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/dermai.yaml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(String, #[source] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default = "default_labels")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_inference_timeout_ms")]
    pub inference_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    #[default]
    Onnx,
    Torch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Scores are used as the model emits them.
    #[default]
    None,
    Softmax,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    #[serde(default = "default_model_path")]
    pub path: String,
    #[serde(default)]
    pub output_activation: OutputActivation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResizeFilter> for image::imageops::FilterType {
    fn from(filter: ResizeFilter) -> Self {
        use image::imageops::FilterType;
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    #[serde(default = "default_image_size")]
    pub size: u32,
    #[serde(default)]
    pub resize_filter: ResizeFilter,
    #[serde(default)]
    pub channel_order: ChannelOrder,
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_inference_timeout_ms() -> u64 {
    30_000
}

fn default_model_path() -> String {
    "models/skin_type_model_final.onnx".to_string()
}

fn default_image_size() -> u32 {
    224
}

fn default_allowed_extensions() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into()]
}

fn default_labels() -> Vec<String> {
    SkinType::labels()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            inference_timeout_ms: default_inference_timeout_ms(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: ModelBackend::default(),
            path: default_model_path(),
            output_activation: OutputActivation::default(),
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            size: default_image_size(),
            resize_filter: ResizeFilter::default(),
            channel_order: ChannelOrder::default(),
            allowed_extensions: default_allowed_extensions(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            model: ModelConfig::default(),
            image: ImageConfig::default(),
            labels: default_labels(),
        }
    }
}

impl AppConfig {
    /// Loads `$DERMAI_CONFIG` (or the default path), then applies env overrides.
    /// A missing file at the default location yields the built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::var("DERMAI_CONFIG").ok();
        let path = explicit.clone().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

        let mut config = if explicit.is_some() || Path::new(&path).exists() {
            Self::from_file(&path)?
        } else {
            log::warn!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.display().to_string(), e))?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(port) = std::env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {}", port)))?;
        }
        if let Ok(model_path) = std::env::var("DERMAI_MODEL_PATH") {
            self.model.path = model_path;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image.size == 0 {
            return Err(ConfigError::Invalid("image.size must be positive".into()));
        }
        if self.labels.is_empty() {
            return Err(ConfigError::Invalid("labels must not be empty".into()));
        }
        let unique: HashSet<&String> = self.labels.iter().collect();
        if unique.len() != self.labels.len() {
            return Err(ConfigError::Invalid("labels must be unique".into()));
        }
        if self.image.allowed_extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "image.allowed_extensions must not be empty".into(),
            ));
        }
        if self.server.inference_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "server.inference_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.image
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}
