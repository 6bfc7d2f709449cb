use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, web};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use shared::{AnalyzeImageRequest, ErrorResponse};
use uuid::Uuid;

use crate::cascade::CascadeOutcome;
use crate::codec::{CodecError, ImagePayload};
use crate::registry::Registry;

/// Largest multipart part buffered by the upload route, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimit(pub usize);

impl Default for UploadLimit {
    fn default() -> Self {
        Self(32 * 1024 * 1024)
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(health)))
        .service(web::resource("/analyze-image").route(web::post().to(analyze_image)))
        .service(web::resource("/analyze-image/upload").route(web::post().to(upload_image)))
        .service(web::resource("/model-status").route(web::get().to(model_status)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("PCOS Prediction API is running.")
}

async fn model_status(registry: web::Data<Registry>) -> HttpResponse {
    HttpResponse::Ok().json(registry.availability())
}

async fn analyze_image(
    registry: web::Data<Registry>,
    body: web::Json<AnalyzeImageRequest>,
) -> HttpResponse {
    let request_id = Uuid::new_v4();
    let Some(image) = body.into_inner().image.filter(|s| !s.trim().is_empty()) else {
        warn!("[{}] Request without image data", request_id);
        return HttpResponse::BadRequest().json(ErrorResponse::new("No image data provided"));
    };

    match ImagePayload::from_base64(&image) {
        Ok(payload) => run_analysis(registry, payload, request_id).await,
        Err(e) => codec_error(request_id, e),
    }
}

async fn upload_image(
    registry: web::Data<Registry>,
    limit: Option<web::Data<UploadLimit>>,
    mut multipart: Multipart,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let limit = limit.map_or(UploadLimit::default().0, |l| l.0);
    let mut upload: Option<ImagePayload> = None;

    while let Some(mut field) = multipart.try_next().await? {
        if upload.is_some() {
            // Image already taken; drain without buffering.
            while let Some(chunk) = field.next().await {
                chunk?;
            }
            continue;
        }

        let media_type = field.content_type().map(|m| m.to_string());
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            if data.len() + chunk.len() > limit {
                warn!("[{}] Upload exceeds {} bytes", request_id, limit);
                return Ok(HttpResponse::PayloadTooLarge().json(ErrorResponse::new(format!(
                    "Uploaded image exceeds the {} byte limit",
                    limit
                ))));
            }
            data.extend_from_slice(&chunk);
        }
        // First non-empty part is the image.
        if !data.is_empty() {
            upload = Some(ImagePayload::from_bytes(data, media_type));
        }
    }

    let Some(payload) = upload else {
        warn!("[{}] Upload without image data", request_id);
        return Ok(HttpResponse::BadRequest().json(ErrorResponse::new("No image data provided")));
    };
    Ok(run_analysis(registry, payload, request_id).await)
}

async fn run_analysis(
    registry: web::Data<Registry>,
    payload: ImagePayload,
    request_id: Uuid,
) -> HttpResponse {
    info!(
        "[{}] Analyzing {:?} image, {} bytes, sha256 {}",
        request_id,
        payload.source(),
        payload.bytes().len(),
        payload.digest()
    );

    match web::block(move || registry.analyze_image(&payload)).await {
        Ok(Ok(outcome)) => outcome_response(request_id, outcome),
        Ok(Err(e)) => codec_error(request_id, e),
        Err(e) => {
            error!("[{}] Analysis worker failed: {}", request_id, e);
            HttpResponse::InternalServerError()
                .json(ErrorResponse::new(format!("Image analysis failed: {}", e)))
        }
    }
}

fn codec_error(request_id: Uuid, e: CodecError) -> HttpResponse {
    warn!("[{}] {}", request_id, e);
    HttpResponse::BadRequest().json(ErrorResponse::new(e.to_string()))
}

pub fn outcome_response(request_id: Uuid, outcome: CascadeOutcome) -> HttpResponse {
    match outcome {
        CascadeOutcome::Resolved { result, .. } => {
            info!("[{}] Resolved by {}", request_id, result.method);
            HttpResponse::Ok().json(result)
        }
        CascadeOutcome::Rejected { result, .. } => {
            info!("[{}] Rejected by {}", request_id, result.method);
            HttpResponse::BadRequest().json(result)
        }
        CascadeOutcome::Exhausted(report) => {
            error!("[{}] {} methods tried, none succeeded", request_id, report.attempts.len());
            HttpResponse::InternalServerError().json(report)
        }
    }
}
