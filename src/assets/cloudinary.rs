use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{AssetError, ImageFolder, ImageStore, UploadedImage};

const ROOT_FOLDER: &str = "atlas";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    public_id: Option<String>,
    error: Option<UploadErrorBody>,
}

#[derive(Debug, Deserialize)]
struct UploadErrorBody {
    message: String,
}

/// Загрузка через unsigned upload preset. Такой preset не даёт удалять файлы,
/// поэтому `delete` ничего не делает.
#[derive(Clone)]
pub struct CloudinaryImageStore {
    client: Client,
    upload_url: String,
    upload_preset: String,
}

impl CloudinaryImageStore {
    pub fn new(cloud_name: &str, upload_preset: &str) -> Self {
        Self {
            client: Client::new(),
            upload_url: format!(
                "https://api.cloudinary.com/v1_1/{}/image/upload",
                cloud_name
            ),
            upload_preset: upload_preset.to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, bytes: Vec<u8>, folder: ImageFolder) -> Result<UploadedImage, AssetError> {
        let size = bytes.len();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name("image"))
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", format!("{}/{}", ROOT_FOLDER, folder.as_str()));

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .timeout(std::time::Duration::from_secs(60))
            .send()
            .await?;

        let status = response.status();
        let body: UploadResponse = response.json().await?;

        match (body.secure_url, body.public_id) {
            (Some(url), Some(path)) => {
                log::debug!("Uploaded {} bytes to {}", size, path);
                Ok(UploadedImage { url, path })
            }
            _ => {
                let message = body
                    .error
                    .map(|e| e.message)
                    .unwrap_or_else(|| format!("upload failed with status {}", status));
                log::error!("Image upload rejected: {}", message);
                Err(AssetError::Rejected(message))
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<(), AssetError> {
        log::debug!("Skipping deletion of {} (unsigned preset)", path);
        Ok(())
    }
}
