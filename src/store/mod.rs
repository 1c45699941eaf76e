//! Абстракция документного хранилища: коллекции документов, подписки на
//! полные снимки коллекций и атомарные пакетные записи.

pub mod connector;
pub mod entity;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

pub const BANNERS: &str = "banners";
pub const CATEGORIES: &str = "bannerCategories";
pub const SHOWCASES: &str = "showcases";
pub const COMPANY_INFO: &str = "companyInfo";

pub type Fields = Map<String, Value>;

/// Полный снимок коллекции в порядке поступления документов.
pub type Snapshot = Vec<Document>;

/// Бесконечный поток снимков одной коллекции. Первый элемент — текущее состояние.
pub type SnapshotStream = BoxStream<'static, Result<Snapshot, StoreError>>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sea_orm::DbErr> for StoreError {
    fn from(e: sea_orm::DbErr) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Декодирует документ в типизированную модель; `id` подставляется из ключа документа.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Сериализует модель в набор полей документа (без `id`).
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(StoreError::Backend(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    Update {
        collection: String,
        id: String,
        fields: Fields,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl BatchOp {
    pub fn collection(&self) -> &str {
        match self {
            BatchOp::Update { collection, .. } | BatchOp::Delete { collection, .. } => collection,
        }
    }
}

/// Набор операций, применяемых по принципу «всё или ничего».
/// Обновление отсутствующего документа проваливает весь пакет.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, collection: &str, id: &str, fields: Fields) -> &mut Self {
        self.ops.push(BatchOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(BatchOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Имена затронутых коллекций без повторов.
    pub fn collections(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for op in &self.ops {
            if !names.iter().any(|n| n == op.collection()) {
                names.push(op.collection().to_string());
            }
        }
        names
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Открывает подписку на коллекцию. Подписка освобождается при drop потока.
    fn subscribe(&self, collection: &str) -> SnapshotStream;

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Создаёт документ и возвращает его сгенерированный id.
    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Сливает `fields` поверх существующего документа.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Удаление отсутствующего документа ошибкой не считается.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Точное сравнение значения поля; значение никогда не встраивается в текст запроса.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot, StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

pub(crate) fn field_matches(doc: &Document, field: &str, value: &Value) -> bool {
    doc.fields.get(field) == Some(value)
}

pub(crate) fn merge_fields(target: &mut Fields, fields: Fields) {
    for (key, value) in fields {
        target.insert(key, value);
    }
}

/// Превращает `watch`-канал в поток снимков. При `include_current` первым
/// элементом идёт текущее значение канала.
pub(crate) fn watch_stream(rx: watch::Receiver<Snapshot>, include_current: bool) -> SnapshotStream {
    stream::unfold((rx, include_current), |(mut rx, emit_now)| async move {
        if !emit_now && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        Some((Ok(snapshot), (rx, false)))
    })
    .boxed()
}
