//! Синхронизатор живых данных: три подписки (баннеры, категории, контакты),
//! состояние в памяти, запись в локальный кэш и окно «загрузки».

use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::{BANNERS_KEY, CATEGORIES_KEY, COMPANY_KEY, LocalCache};
use crate::models::{Banner, Category, CompanyInfo};
use crate::store::{
    BANNERS, CATEGORIES, COMPANY_INFO, Document, DocumentStore, Fields, SnapshotStream,
};

/// Текущее состояние каталога. Потребители получают его только для чтения.
#[derive(Clone, Debug)]
pub struct CatalogState {
    pub banners: Arc<Vec<Banner>>,
    pub categories: Arc<Vec<Category>>,
    pub company: Arc<CompanyInfo>,
    pub loading: bool,
}

/// Потоки снимков трёх коллекций.
pub struct Subscriptions {
    pub banners: SnapshotStream,
    pub categories: SnapshotStream,
    pub company: SnapshotStream,
}

impl Subscriptions {
    pub fn open(store: &dyn DocumentStore) -> Self {
        Self {
            banners: store.subscribe(BANNERS),
            categories: store.subscribe(CATEGORIES),
            company: store.subscribe(COMPANY_INFO),
        }
    }
}

#[derive(Default)]
struct LoadingGate {
    banners: AtomicBool,
    categories: AtomicBool,
}

impl LoadingGate {
    fn mark_banners(&self) -> bool {
        self.banners.store(true, Ordering::SeqCst);
        self.categories.load(Ordering::SeqCst)
    }

    fn mark_categories(&self) -> bool {
        self.categories.store(true, Ordering::SeqCst);
        self.banners.load(Ordering::SeqCst)
    }
}

trait Ordered {
    fn order(&self) -> i64;
}

impl Ordered for Banner {
    fn order(&self) -> i64 {
        self.order
    }
}

impl Ordered for Category {
    fn order(&self) -> i64 {
        self.order
    }
}

/// Декодирует снимок и стабильно сортирует по `order`; равные сохраняют порядок поступления.
fn decode_sorted<T>(collection: &str, docs: &[Document]) -> Vec<T>
where
    T: serde::de::DeserializeOwned + Ordered,
{
    let mut items: Vec<T> = docs
        .iter()
        .filter_map(|doc| match doc.decode::<T>() {
            Ok(item) => Some(item),
            Err(e) => {
                log::warn!("Skipping malformed {} document {}: {}", collection, doc.id, e);
                None
            }
        })
        .collect();
    items.sort_by_key(|item| item.order());
    items
}

/// Запись в кэш уходит в пул блокирующих задач; порядок записей одной подписки сохраняется.
async fn write_through<F>(cache: &LocalCache, write: F)
where
    F: FnOnce(&LocalCache) + Send + 'static,
{
    let cache = cache.clone();
    if let Err(e) = tokio::task::spawn_blocking(move || write(&cache)).await {
        log::debug!("Cache write task failed: {}", e);
    }
}

fn clear_loading(state: &watch::Sender<CatalogState>) {
    state.send_if_modified(|s| {
        let changed = s.loading;
        s.loading = false;
        changed
    });
}

/// Владелец синхронизированного состояния. Задачи подписок завершаются при drop.
pub struct LiveData {
    state: Arc<watch::Sender<CatalogState>>,
    tasks: Vec<JoinHandle<()>>,
}

impl LiveData {
    pub fn activate_from_store(
        store: &dyn DocumentStore,
        cache: LocalCache,
        loading_timeout: Duration,
    ) -> Self {
        Self::activate(Subscriptions::open(store), cache, loading_timeout)
    }

    /// Запускает подписки. Должен вызываться внутри tokio runtime.
    pub fn activate(subs: Subscriptions, cache: LocalCache, loading_timeout: Duration) -> Self {
        let cached_banners: Option<Vec<Banner>> = cache.load(BANNERS_KEY);
        let cached_categories: Option<Vec<Category>> = cache.load(CATEGORIES_KEY);
        let cached_company: Option<Fields> = cache.load(COMPANY_KEY);
        let has_cached = cached_banners.is_some() || cached_categories.is_some();

        let initial = CatalogState {
            banners: Arc::new(cached_banners.unwrap_or_default()),
            categories: Arc::new(cached_categories.unwrap_or_default()),
            company: Arc::new(
                cached_company
                    .map(|f| CompanyInfo::merged_over_defaults(&f))
                    .unwrap_or_default(),
            ),
            loading: !has_cached,
        };
        if has_cached {
            log::debug!("Starting from cached catalog snapshot");
        }

        let (tx, _rx) = watch::channel(initial);
        let state = Arc::new(tx);
        let gate = Arc::new(LoadingGate::default());

        let banners_task = {
            let state = state.clone();
            let gate = gate.clone();
            let cache = cache.clone();
            let mut stream = subs.banners;
            tokio::spawn(async move {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(docs) => {
                            let banners: Arc<Vec<Banner>> = Arc::new(decode_sorted(BANNERS, &docs));
                            let cached = banners.clone();
                            write_through(&cache, move |c| c.save(BANNERS_KEY, cached.as_slice()))
                                .await;
                            state.send_modify(|s| s.banners = banners);
                        }
                        Err(e) => log::warn!("Banners subscription error: {}", e),
                    }
                    if gate.mark_banners() {
                        clear_loading(&state);
                    }
                }
                log::debug!("Banners subscription closed");
            })
        };

        let categories_task = {
            let state = state.clone();
            let gate = gate.clone();
            let cache = cache.clone();
            let mut stream = subs.categories;
            tokio::spawn(async move {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(docs) => {
                            let categories: Arc<Vec<Category>> =
                                Arc::new(decode_sorted(CATEGORIES, &docs));
                            let cached = categories.clone();
                            write_through(&cache, move |c| c.save(CATEGORIES_KEY, cached.as_slice()))
                                .await;
                            state.send_modify(|s| s.categories = categories);
                        }
                        Err(e) => log::warn!("Categories subscription error: {}", e),
                    }
                    if gate.mark_categories() {
                        clear_loading(&state);
                    }
                }
                log::debug!("Categories subscription closed");
            })
        };

        let company_task = {
            let state = state.clone();
            let mut stream = subs.company;
            tokio::spawn(async move {
                while let Some(item) = stream.next().await {
                    match item {
                        Ok(docs) => {
                            // Пустая коллекция не сбрасывает текущие значения
                            if let Some(doc) = docs.first() {
                                let info = CompanyInfo::merged_over_defaults(&doc.fields);
                                let raw = Value::Object(doc.fields.clone());
                                write_through(&cache, move |c| c.save(COMPANY_KEY, &raw)).await;
                                state.send_modify(|s| s.company = Arc::new(info));
                            }
                        }
                        Err(e) => log::warn!("Company info subscription error: {}", e),
                    }
                }
            })
        };

        let timeout_task = {
            let state = state.clone();
            tokio::spawn(async move {
                tokio::time::sleep(loading_timeout).await;
                if state.borrow().loading {
                    log::warn!(
                        "Catalog still loading after {:?}, showing what we have",
                        loading_timeout
                    );
                }
                clear_loading(&state);
            })
        };

        Self {
            state,
            tasks: vec![banners_task, categories_task, company_task, timeout_task],
        }
    }

    pub fn snapshot(&self) -> CatalogState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Ждёт, пока окно загрузки не закроется.
    pub async fn wait_until_loaded(&self) -> CatalogState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|s| !s.loading).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Явно закрывает все подписки.
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
    }
}

impl Drop for LiveData {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStorage, MemoryStorage};
    use crate::clock::SystemClock;
    use crate::store::{MemoryStore, StoreError};
    use futures_util::stream::{self, StreamExt};
    use serde_json::json;
    use tokio::sync::mpsc;

    fn doc(id: &str, value: Value) -> Document {
        Document::new(id, value.as_object().cloned().unwrap())
    }

    fn empty_cache() -> LocalCache {
        LocalCache::new(Arc::new(MemoryStorage::new()), Arc::new(SystemClock))
    }

    fn channel_stream() -> (mpsc::UnboundedSender<Result<Vec<Document>, StoreError>>, SnapshotStream) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let stream = stream::poll_fn(move |cx| rx.poll_recv(cx)).boxed();
        (tx, stream)
    }

    #[tokio::test]
    async fn banners_are_sorted_stably_by_order() {
        let store = MemoryStore::new();
        store.insert(BANNERS, "late", json!({ "order": 2, "active": true }).as_object().cloned().unwrap()).unwrap();
        store.insert(BANNERS, "first-tie", json!({ "order": 1 }).as_object().cloned().unwrap()).unwrap();
        store.insert(BANNERS, "second-tie", json!({ "order": 1 }).as_object().cloned().unwrap()).unwrap();
        store.insert(BANNERS, "no-order", json!({}).as_object().cloned().unwrap()).unwrap();

        let live = LiveData::activate_from_store(&store, empty_cache(), Duration::from_secs(5));
        let state = live.wait_until_loaded().await;

        let ids: Vec<&str> = state.banners.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["no-order", "first-tie", "second-tie", "late"]);
    }

    #[tokio::test]
    async fn loading_waits_for_both_catalog_streams() {
        let (banners_tx, banners) = channel_stream();
        let (categories_tx, categories) = channel_stream();
        let (_company_tx, company) = channel_stream();
        let subs = Subscriptions { banners, categories, company };

        let live = LiveData::activate(subs, empty_cache(), Duration::from_secs(3600));
        let mut rx = live.subscribe();
        assert!(live.is_loading());

        banners_tx.send(Ok(vec![doc("b1", json!({ "order": 0 }))])).unwrap();
        rx.wait_for(|s| s.banners.len() == 1).await.unwrap();
        assert!(live.is_loading());

        categories_tx
            .send(Err(StoreError::Backend("permission denied".into())))
            .unwrap();
        let state = live.wait_until_loaded().await;
        assert_eq!(state.banners.len(), 1);
        assert!(state.categories.is_empty());
    }

    #[tokio::test]
    async fn subscription_error_keeps_previous_data() {
        let (banners_tx, banners) = channel_stream();
        let (categories_tx, categories) = channel_stream();
        let (_company_tx, company) = channel_stream();
        let live = LiveData::activate(
            Subscriptions { banners, categories, company },
            empty_cache(),
            Duration::from_secs(3600),
        );

        banners_tx.send(Ok(vec![doc("b1", json!({}))])).unwrap();
        categories_tx.send(Ok(vec![])).unwrap();
        live.wait_until_loaded().await;

        banners_tx.send(Err(StoreError::Backend("offline".into()))).unwrap();
        banners_tx.send(Ok(vec![doc("b1", json!({})), doc("b2", json!({}))])).unwrap();
        let mut rx = live.subscribe();
        let state = rx.wait_for(|s| s.banners.len() == 2).await.unwrap().clone();
        assert_eq!(state.banners[0].id, "b1");
    }

    #[tokio::test(start_paused = true)]
    async fn loading_clears_after_timeout_without_data() {
        let subs = Subscriptions {
            banners: stream::pending().boxed(),
            categories: stream::pending().boxed(),
            company: stream::pending().boxed(),
        };
        let live = LiveData::activate(subs, empty_cache(), Duration::from_secs(5));
        assert!(live.is_loading());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(live.is_loading());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!live.is_loading());
    }

    #[tokio::test]
    async fn cached_snapshot_skips_loading_and_is_served_first() {
        let cache = empty_cache();
        cache.save(
            BANNERS_KEY,
            &vec![Banner {
                id: "cached".into(),
                active: true,
                ..Banner::default()
            }],
        );

        let subs = Subscriptions {
            banners: stream::pending().boxed(),
            categories: stream::pending().boxed(),
            company: stream::pending().boxed(),
        };
        let live = LiveData::activate(subs, cache, Duration::from_secs(3600));
        let state = live.snapshot();
        assert!(!state.loading);
        assert_eq!(state.banners[0].id, "cached");
    }

    #[tokio::test]
    async fn company_updates_merge_over_defaults_and_write_cache() {
        let store = MemoryStore::new();
        store
            .insert(COMPANY_INFO, "c1", json!({ "phone": "+7 000" }).as_object().cloned().unwrap())
            .unwrap();
        let cache = empty_cache();
        let live = LiveData::activate_from_store(&store, cache.clone(), Duration::from_secs(5));

        let mut rx = live.subscribe();
        let state = rx
            .wait_for(|s| s.company.phone == "+7 000")
            .await
            .unwrap()
            .clone();
        assert_eq!(state.company.name, CompanyInfo::default().name);
        let cached: Fields = cache.load(COMPANY_KEY).unwrap();
        assert_eq!(cached.get("phone"), Some(&json!("+7 000")));
    }

    #[tokio::test]
    async fn store_writes_flow_into_state_and_cache() {
        let store = MemoryStore::new();
        let cache = empty_cache();
        let live = LiveData::activate_from_store(&store, cache.clone(), Duration::from_secs(5));
        live.wait_until_loaded().await;

        store
            .create(BANNERS, json!({ "title": "Новый", "active": true }).as_object().cloned().unwrap())
            .await
            .unwrap();
        let mut rx = live.subscribe();
        rx.wait_for(|s| s.banners.len() == 1).await.unwrap();

        let cached: Vec<Banner> = cache.load(BANNERS_KEY).unwrap();
        assert_eq!(cached[0].title, "Новый");
    }

    /// Хранилище, запись в которое заметно блокирует поток.
    struct SlowStorage {
        inner: MemoryStorage,
    }

    impl CacheStorage for SlowStorage {
        fn get_item(&self, key: &str) -> Option<String> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: String) -> std::io::Result<()> {
            std::thread::sleep(Duration::from_millis(300));
            self.inner.set_item(key, value)
        }
    }

    #[tokio::test]
    async fn slow_cache_writes_do_not_stall_the_runtime() {
        let (banners_tx, banners) = channel_stream();
        let (_c, categories) = channel_stream();
        let (_p, company) = channel_stream();
        let cache = LocalCache::new(
            Arc::new(SlowStorage { inner: MemoryStorage::new() }),
            Arc::new(SystemClock),
        );
        let live = LiveData::activate(
            Subscriptions { banners, categories, company },
            cache.clone(),
            Duration::from_secs(3600),
        );

        let started = std::time::Instant::now();
        banners_tx.send(Ok(vec![doc("b1", json!({ "order": 0 }))])).unwrap();
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(250));

        let mut rx = live.subscribe();
        rx.wait_for(|s| s.banners.len() == 1).await.unwrap();
        let cached: Vec<Banner> = cache.load(BANNERS_KEY).unwrap();
        assert_eq!(cached[0].id, "b1");
    }

    #[tokio::test]
    async fn banner_with_null_fields_and_float_order_is_kept() {
        let store = MemoryStore::new();
        store
            .insert(
                BANNERS,
                "loose",
                json!({ "title": null, "link": null, "order": 1.0, "active": true })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .unwrap();
        store.insert(BANNERS, "first", json!({ "order": 0 }).as_object().cloned().unwrap()).unwrap();

        let live = LiveData::activate_from_store(&store, empty_cache(), Duration::from_secs(5));
        let state = live.wait_until_loaded().await;

        let ids: Vec<&str> = state.banners.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "loose"]);
        assert_eq!(state.banners[1].title, "");
    }

    #[tokio::test]
    async fn shutdown_releases_subscriptions() {
        let (banners_tx, banners) = channel_stream();
        let (_c, categories) = channel_stream();
        let (_p, company) = channel_stream();
        let live = LiveData::activate(
            Subscriptions { banners, categories, company },
            empty_cache(),
            Duration::from_secs(3600),
        );
        live.shutdown().await;
        assert!(banners_tx.is_closed());
    }
}
