use crate::error::{InferenceError, ModelLoadError};
use crate::inference::model::Classifier;
use crate::inference::preprocess::{NormalizedTensor, input_shape};
use std::path::Path;
use tract_onnx::prelude::*;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX export of the classifier, executed with tract.
pub struct OnnxClassifier {
    plan: OnnxPlan,
}

impl OnnxClassifier {
    pub fn load(path: impl AsRef<Path>, image_size: u32) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelLoadError::NotFound(path.display().to_string()));
        }

        log::info!("Loading ONNX model from {}", path.display());
        let [n, h, w, c] = input_shape(image_size);
        let input_fact = InferenceFact::dt_shape(f32::datum_type(), tvec!(n, h, w, c));
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.with_input_fact(0, input_fact))
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| ModelLoadError::Backend(format!("{:#}", e)))?;

        Ok(Self { plan })
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, InferenceError> {
        let data = tensor.as_slice().ok_or(InferenceError::NonContiguous)?;
        let input = Tensor::from_shape(tensor.shape(), data)
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Backend(format!("{:#}", e)))?;
        let output = outputs
            .first()
            .ok_or_else(|| InferenceError::Backend("model produced no outputs".into()))?;
        let scores = output
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Backend(e.to_string()))?;

        Ok(scores.iter().copied().collect())
    }
}
