use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use uuid::Uuid;

use super::{
    BatchOp, Document, DocumentStore, Fields, Snapshot, SnapshotStream, StoreError, WriteBatch,
    field_matches, merge_fields, watch_stream,
};

struct Collection {
    docs: Vec<Document>,
    tx: watch::Sender<Snapshot>,
}

impl Collection {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            docs: Vec::new(),
            tx,
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.docs.iter().position(|d| d.id == id)
    }

    fn publish(&self) {
        self.tx.send_replace(self.docs.clone());
    }
}

/// Хранилище в памяти процесса. Каждая запись публикует новый полный снимок
/// коллекции всем подписчикам.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<Mutex<HashMap<String, Collection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Collection>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    /// Вставляет документ с заданным id (для наполнения тестовыми данными).
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let coll = guard
            .entry(collection.to_string())
            .or_insert_with(Collection::new);
        match coll.position(id) {
            Some(pos) => coll.docs[pos].fields = fields,
            None => coll.docs.push(Document::new(id, fields)),
        }
        coll.publish();
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn subscribe(&self, collection: &str) -> SnapshotStream {
        match self.lock() {
            Ok(mut guard) => {
                let rx = guard
                    .entry(collection.to_string())
                    .or_insert_with(Collection::new)
                    .tx
                    .subscribe();
                watch_stream(rx, true)
            }
            Err(e) => stream::once(async move { Err::<Snapshot, _>(e) }).boxed(),
        }
    }

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .map(|c| c.docs.clone())
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.insert(collection, &id, fields)?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(collection, id, fields);
        self.commit(batch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(collection, id);
        self.commit(batch).await
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(collection)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|d| field_matches(d, field, value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut guard = self.lock()?;

        // Сначала проверяем весь пакет, затем применяем под той же блокировкой.
        for op in batch.ops() {
            if let BatchOp::Update { collection, id, .. } = op {
                let exists = guard
                    .get(collection)
                    .and_then(|c| c.position(id))
                    .is_some();
                if !exists {
                    return Err(StoreError::NotFound {
                        collection: collection.clone(),
                        id: id.clone(),
                    });
                }
            }
        }

        let touched = batch.collections();
        for op in batch.into_ops() {
            match op {
                BatchOp::Update {
                    collection,
                    id,
                    fields,
                } => {
                    if let Some(coll) = guard.get_mut(&collection) {
                        if let Some(pos) = coll.position(&id) {
                            merge_fields(&mut coll.docs[pos].fields, fields);
                        }
                    }
                }
                BatchOp::Delete { collection, id } => {
                    if let Some(coll) = guard.get_mut(&collection) {
                        coll.docs.retain(|d| d.id != id);
                    }
                }
            }
        }

        for name in touched {
            if let Some(coll) = guard.get(&name) {
                coll.publish();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BANNERS;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn batch_with_missing_document_changes_nothing() {
        let store = MemoryStore::new();
        store.insert(BANNERS, "b1", fields(json!({ "category": "Old" }))).unwrap();

        let mut batch = WriteBatch::new();
        batch
            .update(BANNERS, "b1", fields(json!({ "category": "New" })))
            .update(BANNERS, "missing", fields(json!({ "category": "New" })));

        let err = store.commit(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let doc = store.get(BANNERS, "b1").await.unwrap().unwrap();
        assert_eq!(doc.fields.get("category"), Some(&json!("Old")));
    }

    #[tokio::test]
    async fn deleting_missing_document_is_ok() {
        let store = MemoryStore::new();
        store.delete(BANNERS, "nope").await.unwrap();
    }

    #[tokio::test]
    async fn subscription_starts_with_current_state_and_follows_writes() {
        let store = MemoryStore::new();
        store.insert(BANNERS, "b1", fields(json!({ "order": 0 }))).unwrap();

        let mut stream = store.subscribe(BANNERS);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);

        store.create(BANNERS, fields(json!({ "order": 1 }))).await.unwrap();
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].id, "b1");
    }

    #[tokio::test]
    async fn query_eq_matches_exact_value_only() {
        let store = MemoryStore::new();
        store.insert("showcases", "s1", fields(json!({ "slug": "vesna" }))).unwrap();
        store.insert("showcases", "s2", fields(json!({ "slug": "vesna-2" }))).unwrap();

        let hits = store
            .query_eq("showcases", "slug", &json!("vesna"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "s1");
    }
}
