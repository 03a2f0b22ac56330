use crate::config::{AppConfig, ImageConfig, OutputActivation};
use crate::error::{InferenceError, PipelineError};
use crate::inference::model::ModelProvider;
use crate::inference::preprocess::{self, NormalizedTensor, input_shape};
use crate::inference::rank;
use shared::DiagnosisResult;
use std::sync::Arc;

/// preprocess -> classify -> rank over an injected model provider.
#[derive(Clone)]
pub struct InferencePipeline {
    provider: Arc<ModelProvider>,
    image: ImageConfig,
    labels: Vec<String>,
    activation: OutputActivation,
}

impl InferencePipeline {
    pub fn new(provider: Arc<ModelProvider>, config: &AppConfig) -> Self {
        Self {
            provider,
            image: config.image.clone(),
            labels: config.labels.clone(),
            activation: config.model.output_activation,
        }
    }

    pub fn provider(&self) -> &Arc<ModelProvider> {
        &self.provider
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn preprocess(&self, bytes: &[u8]) -> Result<NormalizedTensor, PipelineError> {
        Ok(preprocess::preprocess(bytes, &self.image)?)
    }

    pub fn classify(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, PipelineError> {
        let expected = input_shape(self.image.size);
        if tensor.shape() != expected {
            return Err(InferenceError::ShapeMismatch {
                expected: expected.to_vec(),
                actual: tensor.shape().to_vec(),
            }
            .into());
        }

        let model = self.provider.model()?;
        let scores = model.infer(tensor)?;
        Ok(match self.activation {
            OutputActivation::None => scores,
            OutputActivation::Softmax => rank::softmax(&scores),
        })
    }

    pub fn rank(&self, scores: &[f32]) -> Result<DiagnosisResult, PipelineError> {
        Ok(rank::rank(scores, &self.labels)?)
    }

    /// Runs one uploaded image through the whole pipeline.
    pub fn analyze(&self, bytes: &[u8]) -> Result<DiagnosisResult, PipelineError> {
        let tensor = self.preprocess(bytes)?;
        let scores = self.classify(&tensor)?;
        log::debug!("Raw scores: {:?}", scores);
        let diagnosis = self.rank(&scores)?;
        log::info!(
            "Primary diagnosis: {} ({})",
            diagnosis.primary.label,
            shared::format_percentage(diagnosis.primary.percentage)
        );
        Ok(diagnosis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ImageDecodeError, InvalidScoreVectorError, ModelLoadError};
    use crate::inference::model::Classifier;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use ndarray::Array4;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Vec<f32>);

    impl Classifier for Fixed {
        fn infer(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, InferenceError> {
            assert_eq!(tensor.shape(), &[1, 224, 224, 3]);
            Ok(self.0.clone())
        }
    }

    fn png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(30, 20, Rgb([200, 120, 90])));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn pipeline_with(scores: Vec<f32>, config: &AppConfig) -> InferencePipeline {
        let provider = ModelProvider::ready(Arc::new(Fixed(scores)));
        InferencePipeline::new(Arc::new(provider), config)
    }

    #[test]
    fn analyze_runs_all_stages() {
        let pipeline = pipeline_with(vec![0.1, 0.1, 0.7, 0.1], &AppConfig::default());
        let diagnosis = pipeline.analyze(&png()).unwrap();
        assert_eq!(diagnosis.primary.label, "Oily Skin");
        assert_eq!(diagnosis.breakdown.len(), 4);
    }

    #[test]
    fn corrupt_upload_never_reaches_model() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = ModelProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Fixed(vec![1.0, 0.0, 0.0, 0.0])) as Arc<dyn Classifier>)
        });
        let pipeline = InferencePipeline::new(Arc::new(provider), &AppConfig::default());

        let err = pipeline.analyze(b"\x89PNG garbage").unwrap_err();
        assert!(matches!(err, PipelineError::ImageDecode(ImageDecodeError::Decode(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn classify_rejects_wrong_shape() {
        let pipeline = pipeline_with(vec![0.25; 4], &AppConfig::default());
        let tensor = Array4::<f32>::zeros((1, 3, 224, 224));
        assert!(matches!(
            pipeline.classify(&tensor),
            Err(PipelineError::Inference(InferenceError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn failed_load_short_circuits_every_classify() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let provider = ModelProvider::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ModelLoadError::Backend("corrupt weights".into()))
        });
        let pipeline = InferencePipeline::new(Arc::new(provider), &AppConfig::default());
        let tensor = Array4::<f32>::zeros((1, 224, 224, 3));

        for _ in 0..3 {
            assert!(matches!(
                pipeline.classify(&tensor),
                Err(PipelineError::ModelUnavailable(_))
            ));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wrong_output_width_is_invalid_score_vector() {
        let pipeline = pipeline_with(vec![0.5, 0.5], &AppConfig::default());
        assert!(matches!(
            pipeline.analyze(&png()),
            Err(PipelineError::InvalidScoreVector(
                InvalidScoreVectorError::LengthMismatch { scores: 2, labels: 4 }
            ))
        ));
    }

    #[test]
    fn softmax_activation_normalizes_logits() {
        let mut config = AppConfig::default();
        config.model.output_activation = OutputActivation::Softmax;
        let pipeline = pipeline_with(vec![0.0, 3.0, 1.0, 0.0], &config);

        let diagnosis = pipeline.analyze(&png()).unwrap();
        let total: f32 = diagnosis.breakdown.iter().map(|c| c.percentage).sum();
        assert!((total - 100.0).abs() < 1e-3);
        assert_eq!(diagnosis.primary.label, "Acne Skin");
    }
}
