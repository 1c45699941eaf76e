//! Изменения баннеров и категорий из админки. Все записи идут в хранилище;
//! локальное состояние обновится, когда подписка получит новый снимок.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::assets::ImageStore;
use crate::errors::AppError;
use crate::models::banner::BannerInput;
use crate::models::category::{CategoryDeleteMode, CategoryInput};
use crate::models::{Banner, Category};
use crate::ordering::{BulkDeleteReport, delete_assets};
use crate::store::{BANNERS, CATEGORIES, DocumentStore, Fields, WriteBatch, encode};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BannerFields<'a> {
    title: &'a str,
    image_url: &'a str,
    image_path: Option<&'a str>,
    link: &'a str,
    category: Option<&'a str>,
    active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<i64>,
}

fn banner_fields(input: &BannerInput, order: Option<i64>) -> Result<Fields, AppError> {
    if input.image_url.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "Добавьте изображение для баннера".to_string(),
        ));
    }
    Ok(encode(&BannerFields {
        title: &input.title,
        image_url: &input.image_url,
        image_path: input.image_path.as_deref(),
        link: &input.link,
        category: input.category.as_deref().filter(|c| !c.is_empty()),
        active: input.active,
        order,
    })?)
}

/// Новый баннер встаёт в конец списка.
pub async fn create_banner(
    store: &dyn DocumentStore,
    input: &BannerInput,
    current_count: usize,
) -> Result<String, AppError> {
    let fields = banner_fields(input, Some(current_count as i64))?;
    let id = store.create(BANNERS, fields).await?;
    log::info!("Created banner {}", id);
    Ok(id)
}

pub async fn update_banner(
    store: &dyn DocumentStore,
    id: &str,
    input: &BannerInput,
) -> Result<(), AppError> {
    let fields = banner_fields(input, None)?;
    store.update(BANNERS, id, fields).await?;
    Ok(())
}

pub async fn set_banner_active(
    store: &dyn DocumentStore,
    id: &str,
    active: bool,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert("active".into(), json!(active));
    store.update(BANNERS, id, fields).await?;
    Ok(())
}

/// Копия баннера с пометкой в названии, в конце списка.
pub async fn copy_banner(
    store: &dyn DocumentStore,
    source: &Banner,
    current_count: usize,
) -> Result<String, AppError> {
    let title = if source.title.is_empty() {
        "Баннер (копия)".to_string()
    } else {
        format!("{} (копия)", source.title)
    };
    let copy = Banner {
        title,
        order: current_count as i64,
        ..source.clone()
    };
    let id = store.create(BANNERS, encode(&copy)?).await?;
    Ok(id)
}

/// Удаляет документ, затем по возможности изображение.
pub async fn delete_banner(
    store: &dyn DocumentStore,
    images: &dyn ImageStore,
    banner: &Banner,
) -> Result<BulkDeleteReport, AppError> {
    store.delete(BANNERS, &banner.id).await?;
    let asset_failures = delete_assets(images, banner.asset_path()).await;
    Ok(BulkDeleteReport {
        deleted: 1,
        asset_failures,
    })
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImportItem {
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ImportReport {
    pub ok: usize,
    pub failed: usize,
}

/// Создаёт по баннеру на каждое загруженное изображение. Ошибка одного
/// элемента не прерывает остальные.
pub async fn import_banners(
    store: &dyn DocumentStore,
    items: &[ImportItem],
    category: Option<&str>,
    current_count: usize,
) -> ImportReport {
    let mut report = ImportReport::default();
    for item in items {
        let input = BannerInput {
            title: item.title.clone(),
            image_url: item.url.clone(),
            image_path: item.path.clone(),
            link: String::new(),
            category: category.map(str::to_string),
            active: true,
        };
        match create_banner(store, &input, current_count + report.ok).await {
            Ok(_) => report.ok += 1,
            Err(e) => {
                log::error!("Failed to import banner '{}': {}", item.title, e);
                report.failed += 1;
            }
        }
    }
    report
}

fn category_fields(input: &CategoryInput, order: Option<i64>) -> Result<Fields, AppError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput(
            "Введите название категории".to_string(),
        ));
    }
    let mut fields = Fields::new();
    fields.insert("name".into(), json!(name));
    fields.insert("imageUrl".into(), json!(input.image_url));
    fields.insert(
        "imagePath".into(),
        input.image_path.as_ref().map(|p| json!(p)).unwrap_or(Value::Null),
    );
    fields.insert("active".into(), json!(input.active));
    if let Some(order) = order {
        fields.insert("order".into(), json!(order));
    }
    Ok(fields)
}

pub async fn create_category(
    store: &dyn DocumentStore,
    input: &CategoryInput,
    current_count: usize,
) -> Result<String, AppError> {
    let fields = category_fields(input, Some(current_count as i64))?;
    let id = store.create(CATEGORIES, fields).await?;
    log::info!("Created category {} ({})", id, input.name.trim());
    Ok(id)
}

/// Переименование не переносит баннеры: они ссылаются на категорию по имени.
pub async fn update_category(
    store: &dyn DocumentStore,
    id: &str,
    input: &CategoryInput,
) -> Result<(), AppError> {
    let fields = category_fields(input, None)?;
    store.update(CATEGORIES, id, fields).await?;
    Ok(())
}

pub async fn set_category_active(
    store: &dyn DocumentStore,
    id: &str,
    active: bool,
) -> Result<(), AppError> {
    let mut fields = Fields::new();
    fields.insert("active".into(), json!(active));
    store.update(CATEGORIES, id, fields).await?;
    Ok(())
}

/// Удаляет категорию одним пакетом вместе с отвязкой или удалением её баннеров.
pub async fn delete_category(
    store: &dyn DocumentStore,
    images: &dyn ImageStore,
    category: &Category,
    banners: &[Banner],
    mode: CategoryDeleteMode,
) -> Result<BulkDeleteReport, AppError> {
    let members: Vec<&Banner> = banners
        .iter()
        .filter(|b| b.in_category(&category.name))
        .collect();

    let mut batch = WriteBatch::new();
    for banner in &members {
        match mode {
            CategoryDeleteMode::Detach => {
                let mut fields = Fields::new();
                fields.insert("category".into(), Value::Null);
                batch.update(BANNERS, &banner.id, fields);
            }
            CategoryDeleteMode::Cascade => {
                batch.delete(BANNERS, &banner.id);
            }
        }
    }
    batch.delete(CATEGORIES, &category.id);
    store.commit(batch).await?;

    let mut asset_failures = 0;
    let deleted = match mode {
        CategoryDeleteMode::Detach => 0,
        CategoryDeleteMode::Cascade => {
            asset_failures +=
                delete_assets(images, members.iter().filter_map(|b| b.asset_path())).await;
            members.len()
        }
    };
    asset_failures += delete_assets(images, category.asset_path()).await;

    log::info!(
        "Deleted category '{}' ({:?}, {} banners affected)",
        category.name,
        mode,
        members.len()
    );
    Ok(BulkDeleteReport {
        deleted,
        asset_failures,
    })
}
