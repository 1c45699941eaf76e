use actix_web::{HttpResponse, post, web};
use futures_util::StreamExt;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    app_state::AppState,
    assets::{ImageFolder, UploadedImage},
    errors::AppError,
};

#[derive(Deserialize, IntoParams)]
pub struct UploadQuery {
    pub folder: ImageFolder,
}

/// Загружает изображение, переданное телом запроса как есть.
#[utoipa::path(
    post,
    path = "/api/admin/images",
    tag = "Images",
    params(UploadQuery),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Image stored", body = UploadedImage),
        (status = 400, description = "Empty or oversized body"),
        (status = 502, description = "Image hosting rejected the upload")
    )
)]
#[post("")]
pub async fn upload_image(
    data: web::Data<AppState>,
    query: web::Query<UploadQuery>,
    mut payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let limit = data.config.effective_max_upload_bytes();
    let mut bytes = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::InvalidInput(e.to_string()))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::InvalidInput(format!(
                "Image is larger than {} bytes",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    if bytes.is_empty() {
        return Err(AppError::InvalidInput("Image body is empty".to_string()));
    }

    let size = bytes.len();
    let uploaded = data.images.upload(bytes, query.folder).await?;
    log::info!("Uploaded {} bytes to {}", size, uploaded.path);
    Ok(HttpResponse::Created().json(uploaded))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/images").service(upload_image));
}
