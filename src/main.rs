use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use dotenvy::dotenv;
use std::io;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use atlas_storefront::api::{
    self, banners, categories, company, helpers, images, showcases, storefront,
};
use atlas_storefront::app_state::AppState;
use atlas_storefront::assets::{
    DisabledImageStore, ImageFolder, ImageStore, UploadedImage, cloudinary::CloudinaryImageStore,
};
use atlas_storefront::cache::{FileStorage, LocalCache};
use atlas_storefront::catalog::{ImportItem, ImportReport};
use atlas_storefront::clock::{Clock, SystemClock};
use atlas_storefront::config::{Config, DatabaseSettings};
use atlas_storefront::models::{
    Banner, Category, CompanyInfo, Showcase, Visibility,
    banner::BannerInput,
    category::{CategoryDeleteMode, CategoryInput},
};
use atlas_storefront::ordering::BulkDeleteReport;
use atlas_storefront::showcase::ShowcaseDraft;
use atlas_storefront::store::{DocumentStore, MemoryStore, PostgresStore, connector};
use atlas_storefront::sync::LiveData;

fn startup_error(e: impl std::fmt::Display) -> io::Error {
    io::Error::other(e.to_string())
}

async fn open_store() -> io::Result<Arc<dyn DocumentStore>> {
    match DatabaseSettings::from_env() {
        Some(settings) => {
            let db = connector::connect_with_settings(&settings)
                .await
                .map_err(startup_error)?;
            connector::ensure_schema(&db).await.map_err(startup_error)?;
            log::info!("Using PostgreSQL document store");
            Ok(Arc::new(PostgresStore::new(db)))
        }
        None => {
            log::warn!("DATABASE_URL is not set, data lives in memory and is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn open_images(config: &Config) -> Arc<dyn ImageStore> {
    match (
        config.cloudinary_cloud_name.as_deref(),
        config.cloudinary_upload_preset.as_deref(),
    ) {
        (Some(cloud), Some(preset)) => Arc::new(CloudinaryImageStore::new(cloud, preset)),
        _ => {
            log::warn!("Cloudinary is not configured, image uploads are disabled");
            Arc::new(DisabledImageStore)
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env().map_err(startup_error)?;

    let store = open_store().await?;
    let images = open_images(&config);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let cache_path = config.effective_cache_path();
    let cache = LocalCache::new(Arc::new(FileStorage::open(&cache_path)), clock.clone());
    let live = Arc::new(LiveData::activate_from_store(
        store.as_ref(),
        cache,
        config.loading_timeout(),
    ));
    log::info!("Live data started, cache at {}", cache_path);

    let state = AppState::new(store, images, live, clock, config.clone());

    #[derive(OpenApi)]
    #[openapi(
        paths(
            // Storefront
            storefront::get_catalog,
            storefront::get_banners,
            storefront::get_company,
            // Showcases
            showcases::view_showcase,
            showcases::list_showcases,
            showcases::create_showcase,
            showcases::update_showcase,
            showcases::delete_showcase,
            showcases::preview_showcase,
            // Banners
            banners::list_banners,
            banners::create_banner,
            banners::update_banner,
            banners::toggle_banner,
            banners::copy_banner,
            banners::delete_banner,
            banners::bulk_delete,
            banners::bulk_category,
            banners::reorder_banners,
            banners::import_banners,
            // Categories
            categories::list_categories,
            categories::create_category,
            categories::update_category,
            categories::toggle_category,
            categories::delete_category,
            categories::reorder_categories,
            // Company
            company::get_company,
            company::save_company,
            company::autosave_company,
            // Images
            images::upload_image,
        ),
        components(
            schemas(
                // --- Models ---
                Banner,
                Category,
                CompanyInfo,
                Showcase,
                Visibility,

                // --- DTOs & API Structs ---
                BannerInput,
                CategoryInput,
                CategoryDeleteMode,
                ShowcaseDraft,
                ImportItem,
                ImportReport,
                BulkDeleteReport,
                ImageFolder,
                UploadedImage,
                helpers::BannerPage,
                helpers::IdList,
                helpers::ReorderRequest,
                helpers::CreatedResponse,
                storefront::CatalogResponse,
                storefront::CategoryCard,
                showcases::ShowcaseView,
                showcases::ShowcaseUnavailable,
                showcases::UnavailableReason,
                showcases::ShowcaseSummary,
                showcases::ShowcasePreview,
                banners::BulkCategoryRequest,
                banners::BannerReorderRequest,
                banners::ImportRequest,
            )
        ),
        tags(
            (name = "Storefront", description = "Public catalog read from live data"),
            (name = "Showcases", description = "Temporary showcase links and their authoring"),
            (name = "Banners", description = "Banner management endpoints"),
            (name = "Categories", description = "Category management endpoints"),
            (name = "Company", description = "Company contacts"),
            (name = "Images", description = "Image uploads to the hosting")
        )
    )]
    struct ApiDoc;

    let host = config.host.clone();
    let port = config.port;
    let workers = config.effective_workers();

    log::info!("Starting server at http://{}:{} ({} workers)", host, port, workers);
    log::info!("Swagger UI available at http://{}:{}/swagger-ui/", host, port);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::NormalizePath::trim())
            .wrap(middleware::Logger::default())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header(),
            )
            .app_data(web::Data::new(state.clone()))
            .configure(api::configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
