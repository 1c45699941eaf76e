use chrono_tz::Tz;
use std::sync::Arc;

use crate::assets::ImageStore;
use crate::clock::Clock;
use crate::company::{CompanyAutosave, CompanyRepository, StoreCompanyRepository};
use crate::config::Config;
use crate::showcase::ShowcaseAuthor;
use crate::store::DocumentStore;
use crate::sync::LiveData;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub images: Arc<dyn ImageStore>,
    pub live: Arc<LiveData>,
    pub clock: Arc<dyn Clock>,
    pub showcases: ShowcaseAuthor,
    pub company: Arc<dyn CompanyRepository>,
    pub autosave: CompanyAutosave,
    pub config: Config,
    pub timezone: Tz,
}

impl AppState {
    /// Собирает состояние приложения. Запускает фоновую задачу автосохранения,
    /// поэтому вызывается внутри tokio runtime.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        images: Arc<dyn ImageStore>,
        live: Arc<LiveData>,
        clock: Arc<dyn Clock>,
        config: Config,
    ) -> Self {
        let company: Arc<dyn CompanyRepository> =
            Arc::new(StoreCompanyRepository::new(store.clone()));
        let autosave = CompanyAutosave::spawn(company.clone(), config.autosave_idle());
        let timezone = config.get_timezone().unwrap_or(Tz::UTC);

        Self {
            showcases: ShowcaseAuthor::new(store.clone(), clock.clone()),
            store,
            images,
            live,
            clock,
            company,
            autosave,
            config,
            timezone,
        }
    }
}
