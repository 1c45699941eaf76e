//! Контакты компании: репозиторий единственного документа и отложенное автосохранение.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::CompanyInfo;
use crate::store::{COMPANY_INFO, DocumentStore, StoreError, encode};

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get(&self) -> Result<Option<CompanyInfo>, StoreError>;

    /// Создаёт документ, если его нет, иначе обновляет существующий.
    async fn upsert(&self, info: &CompanyInfo) -> Result<(), StoreError>;
}

pub struct StoreCompanyRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreCompanyRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl CompanyRepository for StoreCompanyRepository {
    async fn get(&self) -> Result<Option<CompanyInfo>, StoreError> {
        let docs = self.store.list(COMPANY_INFO).await?;
        Ok(docs
            .first()
            .map(|doc| CompanyInfo::merged_over_defaults(&doc.fields)))
    }

    async fn upsert(&self, info: &CompanyInfo) -> Result<(), StoreError> {
        let fields = encode(info)?;
        let docs = self.store.list(COMPANY_INFO).await?;
        match docs.first() {
            Some(existing) => self.store.update(COMPANY_INFO, &existing.id, fields).await,
            None => self.store.create(COMPANY_INFO, fields).await.map(|_| ()),
        }
    }
}

/// Отложенная запись: каждая правка перезапускает таймер, сохраняется только
/// последняя правка за окно бездействия.
#[derive(Clone)]
pub struct CompanyAutosave {
    tx: mpsc::UnboundedSender<CompanyInfo>,
    task: Arc<JoinHandle<()>>,
}

impl CompanyAutosave {
    pub fn spawn(repo: Arc<dyn CompanyRepository>, idle: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_autosave(repo, idle, rx));
        Self {
            tx,
            task: Arc::new(task),
        }
    }

    pub fn schedule(&self, info: CompanyInfo) {
        if self.tx.send(info).is_err() {
            log::warn!("Company autosave worker has stopped, edit dropped");
        }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

async fn persist(repo: &dyn CompanyRepository, info: &CompanyInfo) {
    match repo.upsert(info).await {
        Ok(()) => log::debug!("Company info saved"),
        Err(e) => log::error!("Failed to save company info: {}", e),
    }
}

async fn run_autosave(
    repo: Arc<dyn CompanyRepository>,
    idle: Duration,
    mut rx: mpsc::UnboundedReceiver<CompanyInfo>,
) {
    while let Some(mut pending) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(info) => pending = info,
                    None => {
                        // Все отправители закрыты: дописываем последнюю правку
                        persist(repo.as_ref(), &pending).await;
                        return;
                    }
                },
                _ = tokio::time::sleep(idle) => break,
            }
        }
        persist(repo.as_ref(), &pending).await;
    }
}
