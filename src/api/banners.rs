use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use utoipa::ToSchema;

use super::helpers::{CreatedResponse, IdList, ReorderRequest, known_banner, live_catalog};
use crate::{
    app_state::AppState,
    catalog::{self, ImportItem, ImportReport},
    errors::AppError,
    models::{Banner, banner::BannerInput},
    ordering::{self, BulkDeleteReport},
    store::BANNERS,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BulkCategoryRequest {
    pub ids: Vec<String>,
    /// `null` снимает категорию
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerReorderRequest {
    #[serde(flatten)]
    pub moves: ReorderRequest,
    /// Список, внутри которого перетаскивают; без него — все баннеры
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    #[serde(default)]
    pub category: Option<String>,
    pub items: Vec<ImportItem>,
}

#[utoipa::path(
    get,
    path = "/api/admin/banners",
    tag = "Banners",
    responses(
        (status = 200, description = "All banners including hidden ones", body = [Banner])
    )
)]
#[get("")]
pub async fn list_banners(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    Ok(HttpResponse::Ok().json(state.banners.as_ref()))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners",
    tag = "Banners",
    request_body = BannerInput,
    responses(
        (status = 201, description = "Banner created", body = CreatedResponse),
        (status = 400, description = "Image is missing")
    )
)]
#[post("")]
pub async fn create_banner(
    data: web::Data<AppState>,
    body: web::Json<BannerInput>,
) -> Result<HttpResponse, AppError> {
    let count = live_catalog(&data).await.banners.len();
    let id = catalog::create_banner(data.store.as_ref(), &body, count).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

#[utoipa::path(
    put,
    path = "/api/admin/banners/{id}",
    tag = "Banners",
    params(
        ("id" = String, Path, description = "Banner ID")
    ),
    request_body = BannerInput,
    responses(
        (status = 204, description = "Banner updated"),
        (status = 404, description = "Banner not found")
    )
)]
#[put("/{id}")]
pub async fn update_banner(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<BannerInput>,
) -> Result<HttpResponse, AppError> {
    catalog::update_banner(data.store.as_ref(), &path.into_inner(), &body).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/{id}/toggle",
    tag = "Banners",
    params(
        ("id" = String, Path, description = "Banner ID")
    ),
    responses(
        (status = 200, description = "Banner visibility flipped", body = Banner),
        (status = 404, description = "Banner not found")
    )
)]
#[post("/{id}/toggle")]
pub async fn toggle_banner(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut banner = known_banner(&live_catalog(&data).await, &path.into_inner())?;
    banner.active = !banner.active;
    catalog::set_banner_active(data.store.as_ref(), &banner.id, banner.active).await?;
    Ok(HttpResponse::Ok().json(banner))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/{id}/copy",
    tag = "Banners",
    params(
        ("id" = String, Path, description = "Banner ID")
    ),
    responses(
        (status = 201, description = "Copy created", body = CreatedResponse),
        (status = 404, description = "Banner not found")
    )
)]
#[post("/{id}/copy")]
pub async fn copy_banner(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let source = known_banner(&state, &path.into_inner())?;
    let count = state.banners.len();
    let id = catalog::copy_banner(data.store.as_ref(), &source, count).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

#[utoipa::path(
    delete,
    path = "/api/admin/banners/{id}",
    tag = "Banners",
    params(
        ("id" = String, Path, description = "Banner ID")
    ),
    responses(
        (status = 200, description = "Banner deleted", body = BulkDeleteReport),
        (status = 404, description = "Banner not found")
    )
)]
#[delete("/{id}")]
pub async fn delete_banner(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let banner = known_banner(&live_catalog(&data).await, &path.into_inner())?;
    let report = catalog::delete_banner(data.store.as_ref(), data.images.as_ref(), &banner).await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/bulk-delete",
    tag = "Banners",
    request_body = IdList,
    responses(
        (status = 200, description = "Banners deleted in one batch", body = BulkDeleteReport)
    )
)]
#[post("/bulk-delete")]
pub async fn bulk_delete(
    data: web::Data<AppState>,
    body: web::Json<IdList>,
) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let report =
        ordering::bulk_delete(data.store.as_ref(), data.images.as_ref(), &state.banners, &body.ids)
            .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/bulk-category",
    tag = "Banners",
    request_body = BulkCategoryRequest,
    responses(
        (status = 204, description = "Category changed for every listed banner"),
        (status = 404, description = "One of the banners does not exist, nothing changed")
    )
)]
#[post("/bulk-category")]
pub async fn bulk_category(
    data: web::Data<AppState>,
    body: web::Json<BulkCategoryRequest>,
) -> Result<HttpResponse, AppError> {
    let category = body.category.as_deref().filter(|c| !c.is_empty());
    ordering::bulk_set_category(data.store.as_ref(), &body.ids, category).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/reorder",
    tag = "Banners",
    request_body = BannerReorderRequest,
    responses(
        (status = 200, description = "New order of ids", body = [String]),
        (status = 400, description = "Id is not in the list")
    )
)]
#[post("/reorder")]
pub async fn reorder_banners(
    data: web::Data<AppState>,
    body: web::Json<BannerReorderRequest>,
) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let ids: Vec<String> = state
        .banners
        .iter()
        .filter(|b| match body.category.as_deref() {
            Some(name) => b.in_category(name),
            None => true,
        })
        .map(|b| b.id.clone())
        .collect();

    let list = ordering::reorder(
        data.store.as_ref(),
        BANNERS,
        &ids,
        &body.moves.moved_id,
        &body.moves.before_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(list))
}

#[utoipa::path(
    post,
    path = "/api/admin/banners/import",
    tag = "Banners",
    request_body = ImportRequest,
    responses(
        (status = 200, description = "Per-item import result", body = ImportReport)
    )
)]
#[post("/import")]
pub async fn import_banners(
    data: web::Data<AppState>,
    body: web::Json<ImportRequest>,
) -> Result<HttpResponse, AppError> {
    let count = live_catalog(&data).await.banners.len();
    let category = body.category.as_deref().filter(|c| !c.is_empty());
    let report = catalog::import_banners(data.store.as_ref(), &body.items, category, count).await;
    log::info!("Imported banners: {} ok, {} failed", report.ok, report.failed);
    Ok(HttpResponse::Ok().json(report))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/banners")
            .service(list_banners)
            .service(bulk_delete)
            .service(bulk_category)
            .service(reorder_banners)
            .service(import_banners)
            .service(create_banner)
            .service(update_banner)
            .service(toggle_banner)
            .service(copy_banner)
            .service(delete_banner),
    );
}
