//! Пакетные изменения: перестановка, массовая смена категории, массовое удаление.
//! Каждая операция — один атомарный пакет записи.

use serde::Serialize;
use serde_json::{Value, json};
use utoipa::ToSchema;

use crate::assets::ImageStore;
use crate::errors::AppError;
use crate::models::Banner;
use crate::store::{BANNERS, DocumentStore, Fields, WriteBatch};

/// Новый порядок id: `moved` вынимается и вставляется прямо перед `before`.
pub fn reordered_ids(ids: &[String], moved: &str, before: &str) -> Result<Vec<String>, AppError> {
    let from = ids
        .iter()
        .position(|id| id == moved)
        .ok_or_else(|| AppError::InvalidInput(format!("{} is not in the list", moved)))?;
    if !ids.iter().any(|id| id == before) {
        return Err(AppError::InvalidInput(format!("{} is not in the list", before)));
    }

    let mut list = ids.to_vec();
    if moved == before {
        return Ok(list);
    }
    let item = list.remove(from);
    let to = list.iter().position(|id| id == before).unwrap_or(list.len());
    list.insert(to, item);
    Ok(list)
}

/// Переставляет элемент и переписывает `order` у всех элементов списка одним пакетом.
pub async fn reorder(
    store: &dyn DocumentStore,
    collection: &str,
    ids: &[String],
    moved: &str,
    before: &str,
) -> Result<Vec<String>, AppError> {
    let list = reordered_ids(ids, moved, before)?;

    let mut batch = WriteBatch::new();
    for (index, id) in list.iter().enumerate() {
        let mut fields = Fields::new();
        fields.insert("order".into(), json!(index));
        batch.update(collection, id, fields);
    }
    log::debug!("Reordering {} items in '{}'", batch.len(), collection);
    store.commit(batch).await?;
    Ok(list)
}

/// Проставляет категорию всем баннерам из `ids`. `None` снимает категорию.
pub async fn bulk_set_category(
    store: &dyn DocumentStore,
    ids: &[String],
    category: Option<&str>,
) -> Result<(), AppError> {
    if ids.is_empty() {
        return Ok(());
    }
    let value = category.map(|c| json!(c)).unwrap_or(Value::Null);
    let mut batch = WriteBatch::new();
    for id in ids {
        let mut fields = Fields::new();
        fields.insert("category".into(), value.clone());
        batch.update(BANNERS, id, fields);
    }
    store.commit(batch).await?;
    log::info!("Moved {} banners to category {:?}", ids.len(), category);
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct BulkDeleteReport {
    pub deleted: usize,
    pub asset_failures: usize,
}

/// Удаляет изображения по одному; сбои только логируются и считаются.
pub async fn delete_assets<'a, I>(images: &dyn ImageStore, paths: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut failures = 0;
    for path in paths {
        if let Err(e) = images.delete(path).await {
            log::warn!("Failed to delete image {}: {}", path, e);
            failures += 1;
        }
    }
    failures
}

/// Атомарно удаляет документы баннеров, затем по возможности их изображения.
/// `known` — последний синхронизированный снимок, из него берутся пути изображений.
pub async fn bulk_delete(
    store: &dyn DocumentStore,
    images: &dyn ImageStore,
    known: &[Banner],
    ids: &[String],
) -> Result<BulkDeleteReport, AppError> {
    if ids.is_empty() {
        return Ok(BulkDeleteReport::default());
    }
    let mut batch = WriteBatch::new();
    for id in ids {
        batch.delete(BANNERS, id);
    }
    store.commit(batch).await?;

    let paths = known
        .iter()
        .filter(|b| ids.contains(&b.id))
        .filter_map(|b| b.asset_path());
    let asset_failures = delete_assets(images, paths).await;

    log::info!(
        "Deleted {} banners ({} image deletions failed)",
        ids.len(),
        asset_failures
    );
    Ok(BulkDeleteReport {
        deleted: ids.len(),
        asset_failures,
    })
}
