use actix_web::{HttpResponse, get, patch, put, web};

use crate::{app_state::AppState, errors::AppError, models::CompanyInfo};

#[utoipa::path(
    get,
    path = "/api/admin/company",
    tag = "Company",
    responses(
        (status = 200, description = "Stored company info or defaults", body = CompanyInfo)
    )
)]
#[get("")]
pub async fn get_company(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let info = data.company.get().await?.unwrap_or_default();
    Ok(HttpResponse::Ok().json(info))
}

#[utoipa::path(
    put,
    path = "/api/admin/company",
    tag = "Company",
    request_body = CompanyInfo,
    responses(
        (status = 204, description = "Company info saved")
    )
)]
#[put("")]
pub async fn save_company(
    data: web::Data<AppState>,
    body: web::Json<CompanyInfo>,
) -> Result<HttpResponse, AppError> {
    data.company.upsert(&body).await?;
    log::info!("Company info saved by administrator");
    Ok(HttpResponse::NoContent().finish())
}

/// Правка из формы с автосохранением: запись уйдёт после паузы в наборе.
#[utoipa::path(
    patch,
    path = "/api/admin/company",
    tag = "Company",
    request_body = CompanyInfo,
    responses(
        (status = 202, description = "Edit scheduled for saving")
    )
)]
#[patch("")]
pub async fn autosave_company(
    data: web::Data<AppState>,
    body: web::Json<CompanyInfo>,
) -> Result<HttpResponse, AppError> {
    if !data.autosave.is_running() {
        return Err(AppError::Internal);
    }
    data.autosave.schedule(body.into_inner());
    Ok(HttpResponse::Accepted().finish())
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/company")
            .service(get_company)
            .service(save_company)
            .service(autosave_company),
    );
}
