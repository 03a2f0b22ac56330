pub mod model;
pub mod onnx;
pub mod pipeline;
pub mod preprocess;
pub mod rank;
#[cfg(feature = "torch")]
pub mod torch;

use crate::config::{AppConfig, ModelBackend};
use crate::error::ModelLoadError;
use model::{Classifier, ModelProvider};
use std::sync::Arc;

pub use pipeline::InferencePipeline;

/// Provider that loads the configured model artifact on first use.
pub fn provider_from_config(config: &AppConfig) -> ModelProvider {
    let backend = config.model.backend;
    let path = config.model.path.clone();
    let image_size = config.image.size;

    ModelProvider::new(move || -> Result<Arc<dyn Classifier>, ModelLoadError> {
        match backend {
            ModelBackend::Onnx => Ok(Arc::new(onnx::OnnxClassifier::load(&path, image_size)?)),
            #[cfg(feature = "torch")]
            ModelBackend::Torch => Ok(Arc::new(torch::TorchClassifier::load(&path)?)),
            #[cfg(not(feature = "torch"))]
            ModelBackend::Torch => Err(ModelLoadError::BackendDisabled("torch".into())),
        }
    })
}
