use crate::error::{InferenceError, ModelLoadError, PipelineError};
use crate::inference::preprocess::NormalizedTensor;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A loaded classifier: one tensor in, one score per class out.
pub trait Classifier: Send + Sync {
    fn infer(&self, tensor: &NormalizedTensor) -> Result<Vec<f32>, InferenceError>;
}

type Loader = Box<dyn Fn() -> Result<Arc<dyn Classifier>, ModelLoadError> + Send + Sync>;

/// Loads the classifier at most once and remembers the outcome, failure included.
pub struct ModelProvider {
    loader: Option<Loader>,
    cell: OnceLock<Result<Arc<dyn Classifier>, ModelLoadError>>,
    attempts: AtomicUsize,
}

impl ModelProvider {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Classifier>, ModelLoadError> + Send + Sync + 'static,
    {
        Self {
            loader: Some(Box::new(loader)),
            cell: OnceLock::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Wraps an already constructed classifier.
    pub fn ready(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            loader: None,
            cell: OnceLock::from(Ok(classifier)),
            attempts: AtomicUsize::new(0),
        }
    }

    fn outcome(&self) -> &Result<Arc<dyn Classifier>, ModelLoadError> {
        self.cell.get_or_init(|| {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            log::info!("Loading classification model");
            // Only `ready` builds a provider without a loader, and its cell is already set.
            let result = match &self.loader {
                Some(loader) => loader(),
                None => Err(ModelLoadError::Backend("no model loader configured".into())),
            };
            match &result {
                Ok(_) => log::info!("Model loaded"),
                Err(e) => log::error!("Failed to load model: {}", e),
            }
            result
        })
    }

    /// Triggers the single load attempt. Later calls return the memoized outcome.
    pub fn load(&self) -> Result<(), ModelLoadError> {
        self.outcome().as_ref().map(|_| ()).map_err(Clone::clone)
    }

    pub fn model(&self) -> Result<Arc<dyn Classifier>, PipelineError> {
        match self.outcome() {
            Ok(model) => Ok(Arc::clone(model)),
            Err(e) => Err(PipelineError::ModelUnavailable(e.to_string())),
        }
    }

    /// `None` while no load has been attempted.
    pub fn status(&self) -> Option<Result<(), ModelLoadError>> {
        self.cell
            .get()
            .map(|outcome| outcome.as_ref().map(|_| ()).map_err(Clone::clone))
    }

    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ModelProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelProvider")
            .field("loaded", &matches!(self.cell.get(), Some(Ok(_))))
            .field("attempts", &self.load_attempts())
            .finish()
    }
}
