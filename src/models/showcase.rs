use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

/// Временная витрина-ссылка над подмножеством каталога.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Showcase {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub banner_ids: BTreeSet<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "super::default_true")]
    pub active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Active,
    Disabled,
    Expired,
}

impl Visibility {
    pub fn label(&self) -> &'static str {
        match self {
            Visibility::Active => "Активна",
            Visibility::Disabled => "Выключена",
            Visibility::Expired => "Истекла",
        }
    }
}
