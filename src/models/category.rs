use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(default)]
    pub id: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "super::null_as_default")]
    pub image_url: String,
    #[serde(default)]
    pub image_path: Option<String>,
    // Отсутствующий флаг означает «видна»
    #[serde(default = "super::default_true", deserialize_with = "super::null_as_true")]
    pub active: bool,
    #[serde(default, deserialize_with = "super::lenient_order")]
    pub order: i64,
}

impl Category {
    pub fn asset_path(&self) -> Option<&str> {
        self.image_path.as_deref().filter(|p| !p.trim().is_empty())
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default = "super::default_true")]
    pub active: bool,
}

/// Что делать с баннерами удаляемой категории. Выбор делается явно.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CategoryDeleteMode {
    /// Баннеры остаются, поле `category` очищается.
    Detach,
    /// Баннеры удаляются вместе с категорией.
    Cascade,
}
