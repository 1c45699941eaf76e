use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{Banner, Showcase, Visibility};
use crate::store::{DocumentStore, SHOWCASES, StoreError};

/// Ищет витрину по точному совпадению адреса. Всегда свежее чтение из хранилища.
pub async fn resolve_by_slug(
    store: &dyn DocumentStore,
    slug: &str,
) -> Result<Option<Showcase>, StoreError> {
    log::debug!("Resolving showcase slug '{}'", slug);
    let docs = store
        .query_eq(SHOWCASES, "slug", &Value::String(slug.to_string()))
        .await?;
    match docs.first() {
        Some(doc) => Ok(Some(doc.decode()?)),
        None => Ok(None),
    }
}

/// `Disabled` проверяется раньше срока действия.
pub fn visibility_status(showcase: &Showcase, now: DateTime<Utc>) -> Visibility {
    if !showcase.active {
        return Visibility::Disabled;
    }
    match showcase.expires_at {
        Some(expires_at) if expires_at < now => Visibility::Expired,
        _ => Visibility::Active,
    }
}

/// Баннер виден в витрине, если он активен и входит в объединение
/// выбранных категорий и явно выбранных баннеров.
fn is_visible_in(showcase: &Showcase, banner: &Banner) -> bool {
    if !banner.active {
        return false;
    }
    let by_category = banner
        .category
        .as_ref()
        .is_some_and(|name| showcase.categories.contains(name));
    by_category || showcase.banner_ids.contains(&banner.id)
}

pub fn resolve_banners(showcase: &Showcase, all_banners: &[Banner]) -> Vec<Banner> {
    let mut visible: Vec<Banner> = all_banners
        .iter()
        .filter(|b| is_visible_in(showcase, b))
        .cloned()
        .collect();
    visible.sort_by_key(|b| b.order);
    visible
}

pub fn count_visible(showcase: &Showcase, all_banners: &[Banner]) -> usize {
    all_banners
        .iter()
        .filter(|b| is_visible_in(showcase, b))
        .count()
}
