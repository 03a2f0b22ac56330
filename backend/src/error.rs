use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared::ErrorResponse;

#[derive(Debug, thiserror::Error)]
pub enum ImageDecodeError {
    #[error("Image data is empty")]
    Empty,
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Unsupported channel count: expected a 3-channel image, got {0}")]
    UnsupportedChannels(String),
}

impl From<image::ImageError> for ImageDecodeError {
    fn from(err: image::ImageError) -> Self {
        ImageDecodeError::Decode(err.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelLoadError {
    #[error("Model file not found: {0}")]
    NotFound(String),
    #[error("Model initialization failed: {0}")]
    Backend(String),
    #[error("Model backend '{0}' is not compiled into this build")]
    BackendDisabled(String),
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("Input tensor shape {actual:?} does not match expected {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Input tensor is not contiguous")]
    NonContiguous,
    #[error("Model error: {0}")]
    Backend(String),
    #[error("Inference timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidScoreVectorError {
    #[error("Score vector has {scores} entries but there are {labels} labels")]
    LengthMismatch { scores: usize, labels: usize },
    #[error("Score vector is empty")]
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    ImageDecode(#[from] ImageDecodeError),
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    InvalidScoreVector(#[from] InvalidScoreVectorError),
}

/// Errors raised by the HTTP adapter before or around the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file in request")]
    MissingFile,
    #[error("Unsupported file type '{0}', expected one of: {1}")]
    UnsupportedExtension(String, String),
    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Upload error: {0}")]
    Upload(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Worker pool error: {0}")]
    Blocking(String),
}

impl ApiError {
    fn pipeline_status(err: &PipelineError) -> StatusCode {
        match err {
            PipelineError::ImageDecode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Inference(InferenceError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::Inference(_) | PipelineError::InvalidScoreVector(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFile | ApiError::UnsupportedExtension(..) | ApiError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(err) => Self::pipeline_status(err),
            ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: format!("Analysis failed: {}", self),
        })
    }
}
