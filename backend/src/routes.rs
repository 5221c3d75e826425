use actix_multipart::{Multipart, MultipartError};
use actix_web::web::{self, Bytes};
use actix_web::{Error, HttpRequest, HttpResponse};
use futures::StreamExt;
use log::{debug, error, info};
use serde_json::json;
use sha2::{Digest, Sha256};
use shared::{ErrorDetail, OcrResponse, ValidationErrors};
use uuid::Uuid;

use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const NOT_AN_IMAGE: &str = "Please upload an image file";

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(home)))
        .service(web::resource("/ocr/").route(web::post().to(handle_ocr)))
        .service(web::resource("/api/freshness").route(web::post().to(handle_freshness)));
}

struct Upload {
    data: Bytes,
    digest: String,
}

#[derive(Debug)]
enum UploadError {
    Missing,
    NotImage,
    TooLarge,
    Read(MultipartError),
}

impl UploadError {
    fn into_response(self) -> HttpResponse {
        match self {
            UploadError::Missing => {
                HttpResponse::UnprocessableEntity().json(ValidationErrors::missing_field(UPLOAD_FIELD))
            }
            UploadError::NotImage => HttpResponse::BadRequest().json(ErrorDetail {
                detail: NOT_AN_IMAGE.into(),
            }),
            UploadError::TooLarge => HttpResponse::PayloadTooLarge().json(ErrorDetail {
                detail: "Uploaded file is too large".into(),
            }),
            UploadError::Read(e) => HttpResponse::BadRequest().json(ErrorDetail {
                detail: format!("Malformed multipart body: {e}"),
            }),
        }
    }
}

/// Pulls the `file` field out of a multipart body, checking that it is
/// declared as an image and fits the upload limit.
async fn read_image_upload(
    req: &HttpRequest,
    payload: web::Payload,
    limit: usize,
) -> Result<Upload, UploadError> {
    let mut multipart = Multipart::new(req.headers(), payload);
    let mut seen_field = false;

    while let Some(item) = multipart.next().await {
        let mut field = match item {
            Ok(field) => field,
            // A body that is not multipart at all carries no file field.
            Err(e) if !seen_field => {
                debug!("Request has no readable multipart body: {e}");
                return Err(UploadError::Missing);
            }
            Err(e) => return Err(UploadError::Read(e)),
        };
        seen_field = true;

        if field.name() != Some(UPLOAD_FIELD) {
            while let Some(chunk) = field.next().await {
                chunk.map_err(UploadError::Read)?;
            }
            continue;
        }

        let is_image = field
            .content_type()
            .is_some_and(|mime| mime.essence_str().starts_with("image/"));
        if !is_image {
            return Err(UploadError::NotImage);
        }

        let mut image_data = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(UploadError::Read)?;
            if image_data.len() + data.len() > limit {
                return Err(UploadError::TooLarge);
            }
            image_data.extend_from_slice(&data);
        }

        let digest = hex::encode(Sha256::digest(&image_data));
        return Ok(Upload {
            data: Bytes::from(image_data),
            digest,
        });
    }

    Err(UploadError::Missing)
}

async fn home() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "msg": "Welcome to FreshLens!" }))
}

async fn handle_ocr(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let upload = match read_image_upload(&req, payload, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => {
            info!("[{request_id}] OCR upload rejected: {e:?}");
            return Ok(e.into_response());
        }
    };
    debug!("[{request_id}] OCR upload {} ({} bytes)", upload.digest, upload.data.len());

    match state.ocr.read_text(upload.data).await {
        Ok(text) => Ok(HttpResponse::Ok().json(OcrResponse { text })),
        Err(e) => {
            error!("[{request_id}] OCR processing failed: {e}");
            Ok(HttpResponse::InternalServerError().json(ErrorDetail {
                detail: format!("OCR processing failed: {e}"),
            }))
        }
    }
}

async fn handle_freshness(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let request_id = Uuid::new_v4();
    let upload = match read_image_upload(&req, payload, state.max_upload_bytes).await {
        Ok(upload) => upload,
        Err(e) => {
            info!("[{request_id}] Freshness upload rejected: {e:?}");
            return Ok(e.into_response());
        }
    };
    debug!("[{request_id}] Freshness upload {} ({} bytes)", upload.digest, upload.data.len());

    let worker_state = state.clone();
    let response = web::block(move || worker_state.freshness.assess(&upload.data)).await?;

    if response.is_success() {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::InternalServerError().json(response))
    }
}
