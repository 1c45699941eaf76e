pub mod banner;
pub mod category;
pub mod company;
pub mod showcase;

pub use banner::Banner;
pub use category::Category;
pub use company::CompanyInfo;
pub use showcase::{Showcase, Visibility};

use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub(crate) fn default_true() -> bool {
    true
}

/// `null` в документе читается как значение по умолчанию.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Флаг видимости: `null` и небулевы значения означают «видна».
pub(crate) fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(flag) => flag,
        _ => true,
    })
}

/// Порядок из документа: дробные числа и числа-строки приводятся к целому,
/// всё остальное считается нулём.
pub(crate) fn lenient_order<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    })
}
