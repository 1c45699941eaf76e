use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;

use super::slug::{clean_slug, derive_slug};
use crate::clock::Clock;
use crate::models::Showcase;
use crate::store::{DocumentStore, Fields, SHOWCASES, StoreError};

pub const DEFAULT_LIFETIME_DAYS: i64 = 7;

/// Черновик витрины из формы администратора.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowcaseDraft {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Адрес, введённый вручную. Пустой — вывести из названия.
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub banner_ids: BTreeSet<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Error, Debug)]
pub enum AuthoringError {
    #[error("Введите название витрины")]
    EmptyName,

    #[error("Введите slug (адрес) витрины")]
    EmptySlug,

    #[error("Выберите хотя бы одну категорию или баннер")]
    EmptySelection,

    #[error("Slug \"{0}\" уже используется. Выберите другой.")]
    DuplicateSlug(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Черновик, прошедший проверки, с окончательным адресом.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidShowcase {
    pub id: Option<String>,
    pub name: String,
    pub slug: String,
    pub categories: BTreeSet<String>,
    pub banner_ids: BTreeSet<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
}

fn effective_slug(draft: &ShowcaseDraft) -> String {
    match draft.slug.as_deref().map(str::trim) {
        Some(manual) if !manual.is_empty() => clean_slug(manual),
        _ => derive_slug(&draft.name),
    }
}

/// Проверки, не требующие обращения к хранилищу.
pub fn check_fields(draft: &ShowcaseDraft) -> Result<ValidShowcase, AuthoringError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(AuthoringError::EmptyName);
    }

    let slug = effective_slug(draft);
    if slug.is_empty() {
        return Err(AuthoringError::EmptySlug);
    }

    if draft.categories.is_empty() && draft.banner_ids.is_empty() {
        return Err(AuthoringError::EmptySelection);
    }

    Ok(ValidShowcase {
        id: draft.id.clone().filter(|id| !id.is_empty()),
        name: name.to_string(),
        slug,
        categories: draft.categories.clone(),
        banner_ids: draft.banner_ids.clone(),
        expires_at: draft.expires_at,
        active: draft.active.unwrap_or(true),
    })
}

/// Адрес свободен, если его не занимает ни одна *другая* витрина.
pub async fn is_slug_unique(
    store: &dyn DocumentStore,
    slug: &str,
    exclude_id: Option<&str>,
) -> Result<bool, StoreError> {
    let docs = store
        .query_eq(SHOWCASES, "slug", &Value::String(slug.to_string()))
        .await?;
    Ok(docs.iter().all(|d| Some(d.id.as_str()) == exclude_id))
}

/// Полная проверка черновика, включая уникальность адреса.
pub async fn validate(
    store: &dyn DocumentStore,
    draft: &ShowcaseDraft,
) -> Result<ValidShowcase, AuthoringError> {
    let valid = check_fields(draft)?;
    if !is_slug_unique(store, &valid.slug, valid.id.as_deref()).await? {
        return Err(AuthoringError::DuplicateSlug(valid.slug));
    }
    Ok(valid)
}

#[derive(Clone)]
pub struct ShowcaseAuthor {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
}

impl ShowcaseAuthor {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Создаёт или обновляет витрину. Между проверкой адреса и записью
    /// возможна гонка двух администраторов; транзакцией она не закрыта.
    pub async fn save(&self, draft: &ShowcaseDraft) -> Result<Showcase, AuthoringError> {
        let valid = validate(self.store.as_ref(), draft).await?;
        let now = self.clock.now();
        let expires_at = valid
            .expires_at
            .unwrap_or_else(|| now + Duration::days(DEFAULT_LIFETIME_DAYS));

        let mut fields = Fields::new();
        fields.insert("name".into(), json!(valid.name));
        fields.insert("slug".into(), json!(valid.slug));
        fields.insert("categories".into(), json!(valid.categories));
        fields.insert("bannerIds".into(), json!(valid.banner_ids));
        fields.insert("expiresAt".into(), json!(expires_at));
        fields.insert("active".into(), json!(valid.active));

        match valid.id {
            Some(id) => {
                // createdAt не входит в поля обновления и остаётся прежним
                self.store.update(SHOWCASES, &id, fields).await?;
                let doc = self
                    .store
                    .get(SHOWCASES, &id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound {
                        collection: SHOWCASES.to_string(),
                        id: id.clone(),
                    })?;
                log::info!("Updated showcase {} (/v/{})", id, valid.slug);
                Ok(doc.decode()?)
            }
            None => {
                fields.insert("createdAt".into(), json!(now));
                let id = self.store.create(SHOWCASES, fields).await?;
                log::info!("Created showcase {} (/v/{})", id, valid.slug);
                Ok(Showcase {
                    id,
                    name: valid.name,
                    slug: valid.slug,
                    categories: valid.categories,
                    banner_ids: valid.banner_ids,
                    expires_at: Some(expires_at),
                    active: valid.active,
                    created_at: Some(now),
                })
            }
        }
    }

    /// Удаляет только саму витрину; баннеры и категории не затрагиваются.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(SHOWCASES, id).await?;
        log::info!("Deleted showcase {}", id);
        Ok(())
    }

    /// Все витрины, новые первыми.
    pub async fn list(&self) -> Result<Vec<Showcase>, StoreError> {
        let docs = self.store.list(SHOWCASES).await?;
        let mut showcases = docs
            .iter()
            .map(|d| d.decode::<Showcase>())
            .collect::<Result<Vec<_>, _>>()?;
        showcases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(showcases)
    }
}
