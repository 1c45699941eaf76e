use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use uuid::Uuid;

use super::entity::{ActiveModel, Column, Entity, Model};
use super::{
    BatchOp, Document, DocumentStore, Fields, Snapshot, SnapshotStream, StoreError, WriteBatch,
    field_matches, merge_fields, watch_stream,
};

/// Документное хранилище поверх Postgres (sea-orm).
///
/// Подписки получают свежий снимок после каждой записи, прошедшей через этот
/// экземпляр хранилища.
#[derive(Clone)]
pub struct PostgresStore {
    db: DatabaseConnection,
    hub: Arc<Mutex<HashMap<String, watch::Sender<Snapshot>>>>,
}

fn to_document(model: Model) -> Document {
    let fields = match model.data {
        Value::Object(map) => map,
        _ => Fields::new(),
    };
    Document::new(model.id, fields)
}

async fn load_collection<C: ConnectionTrait>(
    conn: &C,
    collection: &str,
) -> Result<Snapshot, StoreError> {
    let rows = Entity::find()
        .filter(Column::Collection.eq(collection))
        .order_by_asc(Column::CreatedAt)
        .order_by_asc(Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(to_document).collect())
}

async fn apply_op<C: ConnectionTrait>(conn: &C, op: BatchOp) -> Result<(), StoreError> {
    match op {
        BatchOp::Update {
            collection,
            id,
            fields,
        } => {
            let row = Entity::find_by_id((collection.clone(), id.clone()))
                .one(conn)
                .await?
                .ok_or(StoreError::NotFound { collection, id })?;

            let mut data = match row.data.clone() {
                Value::Object(map) => map,
                _ => Fields::new(),
            };
            merge_fields(&mut data, fields);

            let mut active = row.into_active_model();
            active.data = Set(Value::Object(data));
            active.updated_at = Set(chrono::Utc::now());
            active.update(conn).await?;
        }
        BatchOp::Delete { collection, id } => {
            Entity::delete_by_id((collection, id)).exec(conn).await?;
        }
    }
    Ok(())
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            hub: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn sender_for(&self, collection: &str) -> Option<watch::Receiver<Snapshot>> {
        let mut hub = self.hub.lock().ok()?;
        let tx = hub
            .entry(collection.to_string())
            .or_insert_with(|| watch::channel(Vec::new()).0);
        Some(tx.subscribe())
    }

    /// Перечитывает коллекцию и рассылает снимок подписчикам, если они есть.
    async fn publish(&self, collection: &str) {
        let has_subscribers = self
            .hub
            .lock()
            .ok()
            .and_then(|hub| hub.get(collection).map(|tx| tx.receiver_count() > 0))
            .unwrap_or(false);
        if !has_subscribers {
            return;
        }

        match load_collection(&self.db, collection).await {
            Ok(snapshot) => {
                if let Ok(hub) = self.hub.lock() {
                    if let Some(tx) = hub.get(collection) {
                        tx.send_replace(snapshot);
                    }
                }
            }
            Err(e) => log::warn!("Failed to refresh '{}' subscribers: {}", collection, e),
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    fn subscribe(&self, collection: &str) -> SnapshotStream {
        let Some(rx) = self.sender_for(collection) else {
            return stream::once(async {
                Err::<Snapshot, _>(StoreError::Backend("subscription hub poisoned".to_string()))
            })
            .boxed();
        };

        let db = self.db.clone();
        let name = collection.to_string();
        let current = stream::once(async move { load_collection(&db, &name).await });
        current.chain(watch_stream(rx, false)).boxed()
    }

    async fn list(&self, collection: &str) -> Result<Snapshot, StoreError> {
        load_collection(&self.db, collection).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = Entity::find_by_id((collection.to_string(), id.to_string()))
            .one(&self.db)
            .await?;
        Ok(row.map(to_document))
    }

    async fn create(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let now = chrono::Utc::now();
        let row = ActiveModel {
            collection: Set(collection.to_string()),
            id: Set(id.clone()),
            data: Set(Value::Object(fields)),
            created_at: Set(now),
            updated_at: Set(now),
        };
        Entity::insert(row).exec_without_returning(&self.db).await?;
        log::debug!("Created document {}/{}", collection, id);

        self.publish(collection).await;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        apply_op(
            &self.db,
            BatchOp::Update {
                collection: collection.to_string(),
                id: id.to_string(),
                fields,
            },
        )
        .await?;
        self.publish(collection).await;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        apply_op(
            &self.db,
            BatchOp::Delete {
                collection: collection.to_string(),
                id: id.to_string(),
            },
        )
        .await?;
        self.publish(collection).await;
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Snapshot, StoreError> {
        let docs = load_collection(&self.db, collection).await?;
        Ok(docs
            .into_iter()
            .filter(|d| field_matches(d, field, value))
            .collect())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let touched = batch.collections();
        let ops = batch.into_ops();
        log::debug!("Committing batch of {} operations", ops.len());

        self.db
            .transaction::<_, (), StoreError>(move |txn| {
                Box::pin(async move {
                    for op in ops {
                        apply_op(txn, op).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => StoreError::from(db_err),
                TransactionError::Transaction(store_err) => store_err,
            })?;

        for name in touched {
            self.publish(&name).await;
        }
        Ok(())
    }
}
