use crate::error::{InferenceError, ModelLoadError};
use crate::inference::model::Classifier;
use crate::inference::preprocess::NormalizedTensor;
use std::path::Path;
use std::sync::Mutex;
use tch::{CModule, Device, Tensor, nn::ModuleT};

/// TorchScript export of the classifier. Calls are serialized through the module lock.
pub struct TorchClassifier {
    model: Mutex<CModule>,
    device: Device,
}

impl TorchClassifier {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.display().to_string()));
        }

        let device = Device::cuda_if_available();
        log::info!("Loading TorchScript model from {} on {:?}", path.display(), device);
        let model = CModule::load_on_device(path, device)
            .map_err(|e| ModelLoadError::Backend(e.to_string()))?;
        Ok(Self {
            model: Mutex::new(model),
            device,
        })
    }
}

impl Classifier for TorchClassifier {
    fn infer(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, InferenceError> {
        let data = tensor.as_slice().ok_or(InferenceError::NonContiguous)?;
        let shape: Vec<i64> = tensor.shape().iter().map(|&d| d as i64).collect();
        let input = Tensor::from_slice(data).view(shape.as_slice()).to_device(self.device);

        let model = self
            .model
            .lock()
            .map_err(|_| InferenceError::Backend("model lock poisoned".into()))?;
        let output = model
            .forward_t(&input, false)
            .to_kind(tch::Kind::Float)
            .to_device(Device::Cpu)
            .view([-1]);

        Vec::<f32>::try_from(output).map_err(|e| InferenceError::Backend(e.to_string()))
    }
}
