use crate::config::DatabaseSettings;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::time::Duration;

use super::StoreError;
use super::entity::CREATE_TABLE_SQL;

pub type DB = DatabaseConnection;

fn connect_options_from_settings(settings: &DatabaseSettings) -> ConnectOptions {
    let mut opt = ConnectOptions::new(settings.url.clone());
    opt.max_connections(10)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(600))
        .sqlx_logging(false);

    if let Some(v) = settings.max_connections {
        opt.max_connections(v);
    }
    if let Some(v) = settings.min_connections {
        opt.min_connections(v);
    }
    if let Some(v) = settings.connect_timeout_secs {
        opt.connect_timeout(Duration::from_secs(v));
    }
    if let Some(v) = settings.acquire_timeout_secs {
        opt.acquire_timeout(Duration::from_secs(v));
    }
    if let Some(v) = settings.idle_timeout_secs {
        opt.idle_timeout(Duration::from_secs(v));
    }
    if let Some(v) = settings.sql_log {
        opt.sqlx_logging(v);
    }

    opt
}

/// Открывает пул подключений и проверяет его простым запросом.
pub async fn connect_with_settings(settings: &DatabaseSettings) -> Result<DB, StoreError> {
    let opt = connect_options_from_settings(settings);
    let db = Database::connect(opt).await.map_err(|e| {
        StoreError::Backend(format!("Failed to connect to document database: {}", e))
    })?;

    db.ping()
        .await
        .map_err(|e| StoreError::Backend(format!("Failed to ping document database: {}", e)))?;

    Ok(db)
}

/// Создаёт таблицу документов, если её ещё нет.
pub async fn ensure_schema(db: &DB) -> Result<(), StoreError> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        CREATE_TABLE_SQL.to_string(),
    ))
    .await?;
    log::info!("Document table is ready");
    Ok(())
}
