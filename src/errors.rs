use serde::Serialize;
use thiserror::Error;

use crate::services::guest_quota_service::QuotaLimit;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Storage capacity exceeded: {required} bytes required, capacity is {capacity} bytes")]
    CapacityExceeded { required: usize, capacity: usize },

    #[error("{0}")]
    Other(String),
}

impl StorageError {
    pub fn is_capacity(&self) -> bool {
        matches!(self, StorageError::CapacityExceeded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Item too large to store: {0}")]
    ItemTooLarge(String),

    #[error("Guest limit reached: {0}")]
    QuotaExceeded(QuotaLimit),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::StorageError(_) => "STORAGE_ERROR",
            AppError::ItemTooLarge(_) => "ITEM_TOO_LARGE",
            AppError::QuotaExceeded(_) => "QUOTA_EXCEEDED",
            AppError::GenerationFailed(_) => "GENERATION_FAILED",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Outcome shape handed to the presentation layer.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
}

impl From<&AppError> for ErrorResponse {
    fn from(err: &AppError) -> Self {
        ErrorResponse {
            error: err.to_string(),
            code: err.error_code(),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::StorageError(err.to_string())
    }
}
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("JSON serialization error: {}", err))
    }
}
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(format!("I/O error: {}", err))
    }
}
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::GenerationFailed(err.to_string())
    }
}
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
