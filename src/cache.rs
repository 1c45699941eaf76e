//! Локальный кэш снимков каталога, чтобы холодный старт не начинался с пустоты.
//!
//! Все ключи делят одну метку `cacheTime`: любая запись продлевает свежесть
//! всех ключей сразу. Ошибки хранилища и разбора никогда не поднимаются наружу.

use chrono::Duration;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::clock::Clock;

pub const CACHE_TIME_KEY: &str = "cacheTime";
pub const BANNERS_KEY: &str = "banners";
pub const CATEGORIES_KEY: &str = "categories";
pub const COMPANY_KEY: &str = "company";

/// Срок свежести кэша — один час.
pub const CACHE_TTL_MS: i64 = 60 * 60 * 1000;

/// Долговременное строковое хранилище ключ/значение.
pub trait CacheStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: String) -> io::Result<()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) -> io::Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| io::Error::other("cache lock poisoned"))?;
        items.insert(key.to_string(), value);
        Ok(())
    }
}

/// Хранит все ключи одним JSON-файлом; файл переписывается при каждой записи.
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<HashMap<String, String>>,
}

impl FileStorage {
    /// Открывает файл кэша. Нечитаемый или повреждённый файл даёт пустой кэш.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let items = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str::<HashMap<String, String>>(&raw).ok())
            .unwrap_or_default();
        log::debug!("Opened cache file {} with {} keys", path.display(), items.len());
        Self {
            path,
            items: Mutex::new(items),
        }
    }

    fn flush(&self, items: &HashMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string(items).map_err(io::Error::other)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)
    }
}

impl CacheStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn set_item(&self, key: &str, value: String) -> io::Result<()> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| io::Error::other("cache lock poisoned"))?;
        items.insert(key.to_string(), value);
        self.flush(&items)
    }
}

#[derive(Clone)]
pub struct LocalCache {
    storage: Arc<dyn CacheStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl LocalCache {
    pub fn new(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            ttl: Duration::milliseconds(CACHE_TTL_MS),
        }
    }

    /// Сохраняет значение и обновляет общую метку времени.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("Cache: cannot serialize '{}': {}", key, e);
                return;
            }
        };
        if let Err(e) = self.storage.set_item(key, raw) {
            log::debug!("Cache: write of '{}' failed: {}", key, e);
            return;
        }
        let stamp = self.clock.now().timestamp_millis().to_string();
        if let Err(e) = self.storage.set_item(CACHE_TIME_KEY, stamp) {
            log::debug!("Cache: write of '{}' failed: {}", CACHE_TIME_KEY, e);
        }
    }

    /// Значение ключа, если общая метка не старше срока свежести.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let stamp: i64 = self.storage.get_item(CACHE_TIME_KEY)?.parse().ok()?;
        let age = self.clock.now().timestamp_millis() - stamp;
        if age > self.ttl.num_milliseconds() {
            return None;
        }
        let raw = self.storage.get_item(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::debug!("Cache: '{}' is unreadable: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};

    struct FullStorage;

    impl CacheStorage for FullStorage {
        fn get_item(&self, _key: &str) -> Option<String> {
            None
        }

        fn set_item(&self, _key: &str, _value: String) -> io::Result<()> {
            Err(io::Error::other("quota exceeded"))
        }
    }

    fn cache_with_clock() -> (LocalCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        let cache = LocalCache::new(Arc::new(MemoryStorage::new()), clock.clone());
        (cache, clock)
    }

    #[test]
    fn load_right_after_save_returns_equal_value() {
        let (cache, _) = cache_with_clock();
        let value = json!([{ "id": "b1", "order": 2 }, { "id": "b2", "title": "Сад" }]);
        cache.save(BANNERS_KEY, &value);
        assert_eq!(cache.load::<Value>(BANNERS_KEY), Some(value));
    }

    #[test]
    fn entries_expire_after_one_hour() {
        let (cache, clock) = cache_with_clock();
        cache.save(BANNERS_KEY, &json!(["x"]));

        clock.advance(Duration::milliseconds(CACHE_TTL_MS));
        assert!(cache.load::<Value>(BANNERS_KEY).is_some());

        clock.advance(Duration::milliseconds(1));
        assert!(cache.load::<Value>(BANNERS_KEY).is_none());
    }

    #[test]
    fn any_write_refreshes_every_key() {
        let (cache, clock) = cache_with_clock();
        cache.save(BANNERS_KEY, &json!(["old"]));
        clock.advance(Duration::minutes(59));
        cache.save(COMPANY_KEY, &json!({ "name": "Атлас" }));
        clock.advance(Duration::minutes(59));
        assert_eq!(cache.load::<Value>(BANNERS_KEY), Some(json!(["old"])));
    }

    #[test]
    fn storage_failures_degrade_silently() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = LocalCache::new(Arc::new(FullStorage), clock);
        cache.save(BANNERS_KEY, &json!(["x"]));
        assert!(cache.load::<Value>(BANNERS_KEY).is_none());
    }

    #[test]
    fn unparsable_entry_reads_as_none() {
        let (cache, _) = cache_with_clock();
        cache.save(BANNERS_KEY, &json!({ "not": "a list" }));
        assert!(cache.load::<Vec<String>>(BANNERS_KEY).is_none());
    }

    #[test]
    fn file_storage_persists_between_opens() {
        let dir = std::env::temp_dir().join(format!("atlas-cache-{}", uuid::Uuid::new_v4()));
        let path = dir.join("cache.json");
        {
            let storage = FileStorage::open(&path);
            storage.set_item("k", "\"v\"".to_string()).unwrap();
        }
        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get_item("k").as_deref(), Some("\"v\""));
        let _ = fs::remove_dir_all(dir);
    }
}
