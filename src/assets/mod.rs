//! Хостинг изображений. Сжатие и обработка изображений здесь не выполняются.

pub mod cloudinary;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use cloudinary::CloudinaryImageStore;

#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Upload request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upload rejected: {0}")]
    Rejected(String),

    #[error("Image hosting is not configured")]
    NotConfigured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFolder {
    Banners,
    Categories,
}

impl ImageFolder {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFolder::Banners => "banners",
            ImageFolder::Categories => "categories",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedImage {
    pub url: String,
    /// Адрес содержимого на хостинге; нужен для удаления.
    pub path: String,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, folder: ImageFolder) -> Result<UploadedImage, AssetError>;

    /// Удаление по возможности. Хостинг может его не поддерживать.
    async fn delete(&self, path: &str) -> Result<(), AssetError>;
}

/// Используется, когда хостинг изображений не настроен.
#[derive(Clone, Debug, Default)]
pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _bytes: Vec<u8>, _folder: ImageFolder) -> Result<UploadedImage, AssetError> {
        Err(AssetError::NotConfigured)
    }

    async fn delete(&self, _path: &str) -> Result<(), AssetError> {
        Ok(())
    }
}
