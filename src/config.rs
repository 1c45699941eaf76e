use chrono_tz::Tz;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub public_url: Option<String>,
    pub timezone: Option<String>,
    pub cache_path: Option<String>,
    pub loading_timeout_secs: Option<u64>,
    pub autosave_idle_ms: Option<u64>,
    pub max_upload_bytes: Option<usize>,
    pub cloudinary_cloud_name: Option<String>,
    pub cloudinary_upload_preset: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            public_url: None,
            timezone: Some("UTC".to_string()),
            cache_path: None,
            loading_timeout_secs: None,
            autosave_idle_ms: None,
            max_upload_bytes: None,
            cloudinary_cloud_name: None,
            cloudinary_upload_preset: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let cfg = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("port", 8080)?
            .add_source(config::Environment::default())
            .build()?;

        let mut config: Config = cfg.try_deserialize()?;

        if config.timezone.is_none() {
            config.timezone = Some("UTC".to_string());
        }

        config.validate()?;

        Ok(config)
    }

    /// Временная зона для отображения дат витрин
    pub fn get_timezone(&self) -> Result<Tz, chrono_tz::ParseError> {
        let tz_str = self.timezone.as_deref().unwrap_or("UTC");
        tz_str.parse::<Tz>()
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if !self
            .host
            .chars()
            .all(|c| c.is_alphanumeric() || ".:-_".contains(c))
        {
            return Err(config::ConfigError::Message(
                "Invalid host format".to_string(),
            ));
        }

        if self.port < 1024 {
            return Err(config::ConfigError::Message(
                "Port must be 1024 or higher".to_string(),
            ));
        }

        if let Some(tz_str) = &self.timezone {
            if tz_str.parse::<Tz>().is_err() {
                return Err(config::ConfigError::Message(format!(
                    "Invalid timezone: {}",
                    tz_str
                )));
            }
        }

        if let Some(public_url) = &self.public_url {
            url::Url::parse(public_url).map_err(|e| {
                config::ConfigError::Message(format!("Invalid public_url: {}", e))
            })?;
        }

        if self.cloudinary_cloud_name.is_some() != self.cloudinary_upload_preset.is_some() {
            return Err(config::ConfigError::Message(
                "cloudinary_cloud_name and cloudinary_upload_preset must be set together"
                    .to_string(),
            ));
        }

        // Лимит загрузки изображения: 1B..50MB
        if let Some(limit) = self.max_upload_bytes {
            let max = 50 * 1024 * 1024;
            if limit == 0 || limit > max {
                return Err(config::ConfigError::Message(format!(
                    "max_upload_bytes must be between 1 and {} bytes",
                    max
                )));
            }
        }

        if self.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "workers must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

impl Config {
    pub fn effective_workers(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get)
    }

    pub fn effective_cache_path(&self) -> String {
        self.cache_path
            .clone()
            .unwrap_or_else(|| ".cache/storefront.json".to_string())
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_secs(self.loading_timeout_secs.unwrap_or(5))
    }

    pub fn autosave_idle(&self) -> Duration {
        Duration::from_millis(self.autosave_idle_ms.unwrap_or(1000))
    }

    pub fn effective_max_upload_bytes(&self) -> usize {
        self.max_upload_bytes.unwrap_or(10 * 1024 * 1024)
    }

    /// Публичная ссылка на витрину, если известен внешний адрес.
    pub fn showcase_link(&self, slug: &str) -> Option<String> {
        let base = url::Url::parse(self.public_url.as_deref()?).ok()?;
        base.join(&format!("v/{}", slug)).ok().map(String::from)
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub acquire_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    pub sql_log: Option<bool>,
}

impl DatabaseSettings {
    /// Читает настройки пула; `None`, если DATABASE_URL не задан.
    pub fn from_env() -> Option<Self> {
        let url = env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty())?;
        Some(Self::default_from_url(url))
    }

    pub fn default_from_url(url: String) -> Self {
        Self {
            url,
            max_connections: parse_env_var("DATABASE_MAX_CONNECTIONS"),
            min_connections: parse_env_var("DATABASE_MIN_CONNECTIONS"),
            connect_timeout_secs: parse_env_var("DATABASE_CONNECT_TIMEOUT_SECS"),
            acquire_timeout_secs: parse_env_var("DATABASE_ACQUIRE_TIMEOUT_SECS"),
            idle_timeout_secs: parse_env_var("DATABASE_IDLE_TIMEOUT_SECS"),
            sql_log: parse_env_var("DATABASE_SQL_LOG"),
        }
    }
}

fn parse_env_var<T>(key: &str) -> Option<T>
where
    T: FromStr,
{
    env::var(key).ok().and_then(|value| value.parse::<T>().ok())
}
