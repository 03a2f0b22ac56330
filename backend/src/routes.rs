use crate::config::AppConfig;
use crate::error::{ApiError, InferenceError, PipelineError};
use crate::inference::InferencePipeline;
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::{AnalyzeResponse, ModelStatus};
use std::path::Path;
use std::time::Duration;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/analyze").route(web::post().to(handle_analyze)))
        .service(web::resource("/api/labels").route(web::get().to(get_labels)))
        .service(web::resource("/api/health").route(web::get().to(get_health)));
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

fn file_extension(file_name: &str) -> Option<&str> {
    Path::new(file_name).extension().and_then(|ext| ext.to_str())
}

/// Reads the first file field of the form. Only one image is analyzed per request.
async fn read_upload(payload: &mut Multipart, config: &AppConfig) -> Result<Upload, ApiError> {
    let limit = config.server.max_upload_bytes;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::Upload(e.to_string()))?
    {
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_owned);

        let Some(file_name) = file_name else {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ApiError::Upload(e.to_string()))?;
            }
            continue;
        };

        let extension = file_extension(&file_name).unwrap_or_default();
        if !config.is_allowed_extension(extension) {
            return Err(ApiError::UnsupportedExtension(
                extension.to_string(),
                config.image.allowed_extensions.join(", "),
            ));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::Upload(e.to_string()))?;
            if bytes.len() + data.len() > limit {
                return Err(ApiError::PayloadTooLarge(limit));
            }
            bytes.extend_from_slice(&data);
        }
        return Ok(Upload { file_name, bytes });
    }

    Err(ApiError::MissingFile)
}

async fn handle_analyze(
    pipeline: web::Data<InferencePipeline>,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(&mut payload, &config).await.inspect_err(|e| {
        warn!("Rejected upload: {}", e);
    })?;
    info!("Analyzing {} ({} bytes)", upload.file_name, upload.bytes.len());

    let timeout_ms = config.server.inference_timeout_ms;
    let pipeline = pipeline.into_inner();
    let job = web::block(move || pipeline.analyze(&upload.bytes));

    let outcome = match actix_web::rt::time::timeout(Duration::from_millis(timeout_ms), job).await {
        Ok(Ok(outcome)) => outcome.map_err(ApiError::from),
        Ok(Err(e)) => Err(ApiError::Blocking(e.to_string())),
        Err(_) => Err(PipelineError::from(InferenceError::Timeout(timeout_ms)).into()),
    };

    match outcome {
        Ok(diagnosis) => Ok(HttpResponse::Ok().json(AnalyzeResponse::new(diagnosis))),
        Err(e) => {
            error!("Analysis failed: {}", e);
            Err(e)
        }
    }
}

async fn get_labels(pipeline: web::Data<InferencePipeline>) -> HttpResponse {
    HttpResponse::Ok().json(pipeline.labels())
}

async fn get_health(pipeline: web::Data<InferencePipeline>) -> HttpResponse {
    match pipeline.provider().status() {
        Some(Ok(())) => HttpResponse::Ok().json(ModelStatus::Ready),
        Some(Err(e)) => HttpResponse::ServiceUnavailable().json(ModelStatus::Unavailable {
            reason: e.to_string(),
        }),
        None => HttpResponse::ServiceUnavailable().json(ModelStatus::Pending),
    }
}
