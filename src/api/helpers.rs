use actix_web::web;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::app_state::AppState;
use crate::errors::AppError;
use crate::models::{Banner, Category};
use crate::sync::CatalogState;

pub const BANNERS_PER_PAGE: usize = 12;

#[derive(Deserialize, IntoParams)]
pub struct PageQuery {
    /// Номер страницы, начиная с 1
    pub page: Option<usize>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerPage {
    pub items: Vec<Banner>,
    pub page: usize,
    pub total_pages: usize,
    pub total: usize,
}

/// Нарезает список на страницы по `BANNERS_PER_PAGE`.
pub fn paginate(items: Vec<Banner>, page: Option<usize>) -> BannerPage {
    let total = items.len();
    let total_pages = total.div_ceil(BANNERS_PER_PAGE);
    let page = page.unwrap_or(1).max(1);
    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(BANNERS_PER_PAGE))
        .take(BANNERS_PER_PAGE)
        .collect();
    BannerPage {
        items,
        page,
        total_pages,
        total,
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IdList {
    pub ids: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub moved_id: String,
    pub before_id: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreatedResponse {
    pub id: String,
}

/// Снимок каталога после окна загрузки. Ожидание ограничено таймаутом `LiveData`.
pub async fn live_catalog(data: &web::Data<AppState>) -> CatalogState {
    data.live.wait_until_loaded().await
}

/// Баннер из синхронизированного снимка.
pub fn known_banner(state: &CatalogState, id: &str) -> Result<Banner, AppError> {
    state
        .banners
        .iter()
        .find(|b| b.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Banner with id {} not found", id)))
}

pub fn known_category(state: &CatalogState, id: &str) -> Result<Category, AppError> {
    state
        .categories
        .iter()
        .find(|c| c.id == id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Category with id {} not found", id)))
}
