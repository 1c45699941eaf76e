use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Карточка каталога. `category` — слабая ссылка по имени категории:
/// имя, которому не соответствует ни одна категория, означает «без категории».
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub image_url: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub link: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub active: bool,
    #[serde(default, deserialize_with = "super::lenient_order")]
    pub order: i64,
}

impl Banner {
    pub fn in_category(&self, name: &str) -> bool {
        self.category.as_deref() == Some(name)
    }

    /// Путь к изображению на хостинге, если он есть.
    pub fn asset_path(&self) -> Option<&str> {
        self.image_path.as_deref().filter(|p| !p.trim().is_empty())
    }
}

/// Поля баннера, которые редактирует администратор.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BannerInput {
    #[serde(default)]
    pub title: String,
    pub image_url: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}
