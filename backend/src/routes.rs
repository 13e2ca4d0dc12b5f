use actix_multipart::Multipart;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use futures::{StreamExt, TryStreamExt};
use log::{error, info, warn};
use serde_json::json;
use shared::ClassesResponse;
use uuid::Uuid;

use crate::classifier::{ClassifierError, PlanetAnalytics};

pub const IMAGE_FIELD: &str = "image";
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Upload exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Classifier(ClassifierError::Decode(_)) => "DECODE_ERROR",
            ApiError::Classifier(ClassifierError::Preprocess(_)) => "PREPROCESS_ERROR",
            ApiError::Classifier(ClassifierError::ModelLoad(_)) => "MODEL_LOAD_ERROR",
            ApiError::Classifier(ClassifierError::Inference(_)) => "INFERENCE_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Classifier(ClassifierError::Decode(_)) => StatusCode::BAD_REQUEST,
            ApiError::Classifier(ClassifierError::Preprocess(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Classifier(ClassifierError::ModelLoad(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Classifier(ClassifierError::Inference(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {} ({})", self, status);
        } else {
            warn!("Request rejected: {} ({})", self, status);
        }

        HttpResponse::build(status).json(json!({
            "error": {
                "code": self.error_code(),
                "message": self.to_string(),
            }
        }))
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(root)))
        .service(
            web::scope("/planet")
                .route("/classes", web::get().to(classes_list))
                .route("/predict", web::post().to(predict))
                .route("/predict_proba", web::post().to(predict_proba)),
        );
}

async fn root() -> HttpResponse {
    let html_content = [
        "<html>",
        "    <head>",
        "        <title>Planet classifier</title>",
        "    </head>",
        "    <body>",
        "        <h1>Planet classifier</h1>",
        "        <p>GET /planet/classes, POST /planet/predict, POST /planet/predict_proba</p>",
        "    </body>",
        "</html>",
    ];
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html_content.join("\n"))
}

async fn classes_list(service: web::Data<PlanetAnalytics>) -> HttpResponse {
    HttpResponse::Ok().json(ClassesResponse {
        classes: service.classes().to_vec(),
    })
}

async fn predict(
    service: web::Data<PlanetAnalytics>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let image_data = read_image_field(payload).await?;
    info!("[{}] predict: received {} bytes", request_id, image_data.len());

    let service = service.get_ref().clone();
    let classes = web::block(move || service.classify_bytes(&image_data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!("[{}] predict: {:?}", request_id, classes);
    Ok(HttpResponse::Ok().json(ClassesResponse { classes }))
}

async fn predict_proba(
    service: web::Data<PlanetAnalytics>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let image_data = read_image_field(payload).await?;
    info!("[{}] predict_proba: received {} bytes", request_id, image_data.len());

    let service = service.get_ref().clone();
    let probabilities = web::block(move || service.classify_bytes_with_probabilities(&image_data))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;

    info!("[{}] predict_proba: {} classes scored", request_id, probabilities.len());
    Ok(HttpResponse::Ok().json(probabilities))
}

/// Collects the `image` field; every other field is drained and dropped.
async fn read_image_field(mut payload: Multipart) -> Result<Vec<u8>, ApiError> {
    let mut image_data: Option<Vec<u8>> = None;

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::InvalidInput(e.to_string()))?
    {
        let wanted = image_data.is_none() && field.name() == Some(IMAGE_FIELD);
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::InvalidInput(e.to_string()))?;
            if !wanted {
                continue;
            }
            if data.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::PayloadTooLarge(MAX_UPLOAD_BYTES));
            }
            data.extend_from_slice(&chunk);
        }
        if wanted {
            image_data = Some(data);
        }
    }

    match image_data {
        Some(data) if !data.is_empty() => Ok(data),
        Some(_) => Err(ApiError::InvalidInput(format!("'{}' field is empty", IMAGE_FIELD))),
        None => Err(ApiError::InvalidInput(format!("missing '{}' field", IMAGE_FIELD))),
    }
}
