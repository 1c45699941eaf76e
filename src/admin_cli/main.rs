use atlas_storefront::company::{CompanyRepository, StoreCompanyRepository};
use atlas_storefront::config::DatabaseSettings;
use atlas_storefront::models::CompanyInfo;
use atlas_storefront::store::{
    BANNERS, CATEGORIES, COMPANY_INFO, DocumentStore, PostgresStore, SHOWCASES, connector,
};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use std::sync::Arc;

// Определяем структуру команд CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, verbatim_doc_comment)]
/// Утилита командной строки для администрирования витрины Атлас.
/// Создаёт схему хранилища, заполняет начальные данные и показывает документы.
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Создаёт таблицу документов, если её ещё нет.
    Schema,
    /// Записывает контакты компании по умолчанию, если документа ещё нет.
    SeedCompany {
        /// Перезаписать существующий документ значениями по умолчанию.
        #[arg(long)]
        force: bool,
    },
    /// Выводит все документы коллекции в формате JSON.
    List {
        /// Коллекция: banners, bannerCategories, showcases или companyInfo.
        collection: String,
    },
}

const COLLECTIONS: [&str; 4] = [BANNERS, CATEGORIES, SHOWCASES, COMPANY_INFO];

// Функция для получения хранилища
async fn open_store() -> Result<PostgresStore, Box<dyn std::error::Error>> {
    let settings = DatabaseSettings::from_env().ok_or("Переменная DATABASE_URL не задана")?;
    let db = connector::connect_with_settings(&settings).await?;
    Ok(PostgresStore::new(db))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Schema => {
            let store = open_store().await?;
            connector::ensure_schema(store.connection()).await?;
            println!("Схема хранилища готова.");
        }
        Commands::SeedCompany { force } => {
            let store: Arc<dyn DocumentStore> = Arc::new(open_store().await?);
            let repo = StoreCompanyRepository::new(store);
            match repo.get().await? {
                Some(existing) if !force => {
                    println!("Контакты уже заданы: {}. Используйте --force для перезаписи.", existing.name);
                }
                _ => {
                    repo.upsert(&CompanyInfo::default()).await?;
                    println!("Контакты компании по умолчанию записаны.");
                }
            }
        }
        Commands::List { collection } => {
            if !COLLECTIONS.contains(&collection.as_str()) {
                return Err(format!(
                    "Неизвестная коллекция '{}'. Доступны: {}",
                    collection,
                    COLLECTIONS.join(", ")
                )
                .into());
            }
            let store = open_store().await?;
            let docs = store.list(collection).await?;

            let rows: Vec<Value> = docs
                .into_iter()
                .map(|doc| {
                    let mut row = Map::new();
                    row.insert("id".to_string(), Value::String(doc.id));
                    row.extend(doc.fields);
                    Value::Object(row)
                })
                .collect();

            println!("{}", serde_json::to_string_pretty(&rows)?);
            println!("Документов: {}", rows.len());
        }
    }

    Ok(())
}
