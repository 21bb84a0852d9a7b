//! Offload Core Library
//!
//! Configuration, error taxonomy, domain models and host integration traits shared by every
//! offload crate.

pub mod config;
pub mod encryption;
pub mod error;
pub mod hooks;
pub mod models;
pub mod paths;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, GcsSettings, MaskedStorageConfig, S3Settings, StorageConfig};
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hooks::{FileRepository, InMemoryFileRepository};
pub use models::{FileRecord, FileRecordPatch, MigrationErrorEntry, MigrationOutcome, MigrationReport};
pub use paths::SitePaths;
pub use storage_types::{StorageBackend, Visibility};
