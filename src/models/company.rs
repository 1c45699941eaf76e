use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::store::Fields;

/// Контакты компании. В хранилище существует не более одного такого документа.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyInfo {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub work_hours: String,
    pub telegram: String,
    pub whatsapp: String,
    pub max: String,
    pub description: String,
}

impl Default for CompanyInfo {
    fn default() -> Self {
        Self {
            name: "Атлас".to_string(),
            description: "Торговый комплекс".to_string(),
            address: "г. Туймазы, ул. Гафурова, 58А".to_string(),
            phone: "8 937 151 87 58".to_string(),
            work_hours: "Ежедневно с 09:00 до 18:00".to_string(),
            telegram: "https://t.me/tk_atlas".to_string(),
            whatsapp: "https://chat.whatsapp.com/KK2lH0nQehuE2nA69LtgjA".to_string(),
            max: "https://max.ru/join/9v0xdDEmXAjDMRd5Xlk0AgoaWhGHuTmDFARCul6uwhM".to_string(),
        }
    }
}

impl CompanyInfo {
    /// Накладывает строковые поля документа поверх значений по умолчанию.
    /// Отсутствующие и нестроковые поля берутся из значений по умолчанию.
    pub fn merged_over_defaults(fields: &Fields) -> Self {
        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => return Self::default(),
        };
        for (key, value) in fields {
            if value.is_string() && merged.contains_key(key) {
                merged.insert(key.clone(), value.clone());
            }
        }
        serde_json::from_value(Value::Object(merged)).unwrap_or_default()
    }
}
