use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::assets::AssetError;
use crate::showcase::AuthoringError;
use crate::store::StoreError;

/// Унифицированная структура ответа об ошибке
#[derive(Serialize)]
pub struct ErrorResponse<'a> {
    pub code: &'a str,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Image hosting error: {0}")]
    AssetError(#[from] AssetError),

    #[error("{0}")]
    ValidationError(AuthoringError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal server error")]
    Internal,
}

impl From<AuthoringError> for AppError {
    fn from(e: AuthoringError) -> Self {
        match e {
            AuthoringError::Store(store_err) => AppError::StoreError(store_err),
            other => AppError::ValidationError(other),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::StoreError(StoreError::NotFound { .. }) | AppError::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::StoreError(_) | AppError::JsonError(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::AssetError(_) => StatusCode::BAD_GATEWAY,
            AppError::ValidationError(AuthoringError::DuplicateSlug(_)) => StatusCode::CONFLICT,
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::StoreError(StoreError::NotFound { .. }) => "NOT_FOUND",
            AppError::StoreError(_) => "STORE_ERROR",
            AppError::AssetError(_) => "ASSET_ERROR",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::JsonError(_) => "JSON_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal => "INTERNAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_slug_is_a_conflict() {
        let err = AppError::from(AuthoringError::DuplicateSlug("vesna".into()));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn store_errors_inside_authoring_stay_store_errors() {
        let err = AppError::from(AuthoringError::Store(StoreError::Backend("down".into())));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORE_ERROR");
    }

    #[test]
    fn missing_document_maps_to_404() {
        let err = AppError::from(StoreError::NotFound {
            collection: "banners".into(),
            id: "x".into(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
