use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;
use utoipa::IntoParams;

use super::helpers::{CreatedResponse, ReorderRequest, known_category, live_catalog};
use crate::{
    app_state::AppState,
    catalog,
    errors::AppError,
    models::{
        Category,
        category::{CategoryDeleteMode, CategoryInput},
    },
    ordering::{self, BulkDeleteReport},
    store::CATEGORIES,
};

#[derive(Deserialize, IntoParams)]
pub struct DeleteQuery {
    /// `detach` — оставить баннеры без категории, `cascade` — удалить их
    pub mode: CategoryDeleteMode,
}

#[utoipa::path(
    get,
    path = "/api/admin/categories",
    tag = "Categories",
    responses(
        (status = 200, description = "All categories including hidden ones", body = [Category])
    )
)]
#[get("")]
pub async fn list_categories(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    Ok(HttpResponse::Ok().json(state.categories.as_ref()))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    tag = "Categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = CreatedResponse),
        (status = 400, description = "Name is empty")
    )
)]
#[post("")]
pub async fn create_category(
    data: web::Data<AppState>,
    body: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    let count = live_catalog(&data).await.categories.len();
    let id = catalog::create_category(data.store.as_ref(), &body, count).await?;
    Ok(HttpResponse::Created().json(CreatedResponse { id }))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    tag = "Categories",
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    request_body = CategoryInput,
    responses(
        (status = 204, description = "Category updated"),
        (status = 404, description = "Category not found")
    )
)]
#[put("/{id}")]
pub async fn update_category(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    catalog::update_category(data.store.as_ref(), &path.into_inner(), &body).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/admin/categories/{id}/toggle",
    tag = "Categories",
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category visibility flipped", body = Category),
        (status = 404, description = "Category not found")
    )
)]
#[post("/{id}/toggle")]
pub async fn toggle_category(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut category = known_category(&live_catalog(&data).await, &path.into_inner())?;
    category.active = !category.active;
    catalog::set_category_active(data.store.as_ref(), &category.id, category.active).await?;
    Ok(HttpResponse::Ok().json(category))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    tag = "Categories",
    params(
        ("id" = String, Path, description = "Category ID"),
        DeleteQuery
    ),
    responses(
        (status = 200, description = "Category deleted", body = BulkDeleteReport),
        (status = 400, description = "Mode is missing"),
        (status = 404, description = "Category not found")
    )
)]
#[delete("/{id}")]
pub async fn delete_category(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<DeleteQuery>,
) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let category = known_category(&state, &path.into_inner())?;
    let report = catalog::delete_category(
        data.store.as_ref(),
        data.images.as_ref(),
        &category,
        &state.banners,
        query.mode,
    )
    .await?;
    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories/reorder",
    tag = "Categories",
    request_body = ReorderRequest,
    responses(
        (status = 200, description = "New order of ids", body = [String]),
        (status = 400, description = "Id is not in the list")
    )
)]
#[post("/reorder")]
pub async fn reorder_categories(
    data: web::Data<AppState>,
    body: web::Json<ReorderRequest>,
) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let ids: Vec<String> = state.categories.iter().map(|c| c.id.clone()).collect();
    let list = ordering::reorder(
        data.store.as_ref(),
        CATEGORIES,
        &ids,
        &body.moved_id,
        &body.before_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(list))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/categories")
            .service(list_categories)
            .service(reorder_categories)
            .service(create_category)
            .service(update_category)
            .service(toggle_category)
            .service(delete_category),
    );
}
