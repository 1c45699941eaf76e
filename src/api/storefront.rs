use actix_web::{HttpResponse, get, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::helpers::{BannerPage, live_catalog, paginate};
use crate::{
    app_state::AppState,
    errors::AppError,
    models::{Banner, Category, CompanyInfo},
};

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCard {
    #[serde(flatten)]
    pub category: Category,
    pub banner_count: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResponse {
    pub loading: bool,
    pub categories: Vec<CategoryCard>,
    /// Активные баннеры в порядке `order`
    pub banners: Vec<Banner>,
    pub company: CompanyInfo,
}

#[derive(Deserialize, IntoParams)]
pub struct BannerQuery {
    /// Имя категории; без него — все активные баннеры
    pub category: Option<String>,
    pub page: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "Storefront",
    responses(
        (status = 200, description = "Visible categories, active banners and company info", body = CatalogResponse)
    )
)]
#[get("/catalog")]
pub async fn get_catalog(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    let categories = state
        .categories
        .iter()
        .filter(|c| c.active)
        .map(|c| CategoryCard {
            banner_count: state
                .banners
                .iter()
                .filter(|b| b.active && b.in_category(&c.name))
                .count(),
            category: c.clone(),
        })
        .collect();
    let banners = state.banners.iter().filter(|b| b.active).cloned().collect();

    Ok(HttpResponse::Ok().json(CatalogResponse {
        loading: state.loading,
        categories,
        banners,
        company: state.company.as_ref().clone(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/banners",
    tag = "Storefront",
    params(BannerQuery),
    responses(
        (status = 200, description = "One page of active banners", body = BannerPage)
    )
)]
#[get("/banners")]
pub async fn get_banners(
    data: web::Data<AppState>,
    query: web::Query<BannerQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let state = live_catalog(&data).await;
    let banners: Vec<Banner> = state
        .banners
        .iter()
        .filter(|b| b.active)
        .filter(|b| match query.category.as_deref() {
            Some(name) => b.in_category(name),
            None => true,
        })
        .cloned()
        .collect();

    Ok(HttpResponse::Ok().json(paginate(banners, query.page)))
}

#[utoipa::path(
    get,
    path = "/api/company",
    tag = "Storefront",
    responses(
        (status = 200, description = "Company contacts", body = CompanyInfo)
    )
)]
#[get("/company")]
pub async fn get_company(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let state = live_catalog(&data).await;
    Ok(HttpResponse::Ok().json(state.company.as_ref()))
}

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(get_catalog)
        .service(get_banners)
        .service(get_company);
}
