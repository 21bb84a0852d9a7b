//! Storage abstraction trait
//!
//! This module defines the Storage trait that every remote provider implements.

use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use offload_core::AppError;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File upload failed: {0}")]
    UploadFailed(String),

    #[error("Could not delete file from cloud: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConfigError(msg) => AppError::Configuration(msg),
            StorageError::NotFound(msg) => AppError::NotFound(msg),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            StorageError::IoError(e) => AppError::Internal(format!("IO error: {}", e)),
            other @ (StorageError::UploadFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::BackendError(_)) => AppError::Transfer(other.to_string()),
        }
    }
}

/// Result of probing both buckets of a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub ok: bool,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn ok() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// Storage abstraction trait
///
/// Both remote providers implement this trait so the upload orchestrator, the migration
/// engine and the redirect endpoint never depend on provider details. Each backend owns two
/// buckets, one per visibility class.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Upload the file at `local_path` under `key` in the bucket for `visibility`.
    ///
    /// `file_name` is the user-facing name, kept with the object so downloads suggest it.
    /// Returns the key.
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        visibility: Visibility,
        file_name: &str,
    ) -> StorageResult<String>;

    /// Delete an object.
    ///
    /// A no-op when deleting from the cloud is disabled, the key or bucket is empty, or the
    /// object does not exist. Disabled deletes never touch the network.
    async fn delete(&self, key: &str, visibility: Visibility) -> StorageResult<()>;

    /// Signed, time-limited GET URL for an object.
    ///
    /// When `file_name` is given the download suggests that name.
    async fn get_url(
        &self,
        key: &str,
        file_name: Option<&str>,
        visibility: Visibility,
    ) -> StorageResult<String>;

    /// Stable, non-expiring URL of an object in the public bucket, if the backend has one.
    fn public_url(&self, key: &str) -> Option<String>;

    /// Probe both buckets. Failures are reported in the status, never as an error.
    async fn test_connection(&self) -> ConnectionStatus;

    /// Derive a key for a new object (see `keys::KeyGenerator`).
    fn generate_key(&self, file_name: &str, owner_type: &str, owner_id: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
