//! Entry points for the host application and operators
//!
//! `CloudStorage` bundles the configured backend, the record repository and the site layout.
//! When cloud storage is disabled there is no backend, and every hook is a no-op.

use std::sync::Arc;

use offload_core::models::{FileRecord, MigrationReport};
use offload_core::{AppError, Config, EncryptionService, FileRepository, SitePaths, StorageConfig};
use offload_storage::{create_storage, reference, KeyOverride, Storage};
use serde::Serialize;

use crate::migration::MigrationEngine;
use crate::upload::{SkipReason, UploadOrchestrator, UploadOutcome};

pub const KEY_NOT_FOUND: &str = "Key not found.";

const STORAGE_NOT_ENABLED: &str = "Cloud storage is not enabled";

/// What the download endpoint answers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateFileResponse {
    /// Temporary signed URL to redirect the client to.
    Redirect(String),
    /// Plain-text body, used when the request carries no usable key.
    Body(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}

pub struct CloudStorage {
    storage: Option<Arc<dyn Storage>>,
    files: Arc<dyn FileRepository>,
    orchestrator: Option<Arc<UploadOrchestrator>>,
    workers: usize,
}

impl CloudStorage {
    pub fn new(
        storage: Option<Arc<dyn Storage>>,
        files: Arc<dyn FileRepository>,
        site: SitePaths,
        config: &StorageConfig,
        workers: usize,
    ) -> Self {
        let orchestrator = storage.as_ref().map(|storage| {
            Arc::new(UploadOrchestrator::new(
                storage.clone(),
                files.clone(),
                site,
                config.ignored_owner_types.clone(),
            ))
        });

        Self {
            storage,
            files,
            orchestrator,
            workers,
        }
    }

    /// Build the backend for the configured provider and wire it to `files`.
    pub fn from_config(
        config: &Config,
        files: Arc<dyn FileRepository>,
        cipher: Option<&EncryptionService>,
        key_override: Option<KeyOverride>,
    ) -> Result<Self, AppError> {
        let storage = create_storage(&config.storage, cipher, key_override)?;
        Ok(Self::new(
            storage,
            files,
            SitePaths::new(&config.site_path),
            &config.storage,
            config.migration_workers,
        ))
    }

    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    pub fn storage(&self) -> Option<&Arc<dyn Storage>> {
        self.storage.as_ref()
    }

    /// Look up a record by name.
    pub async fn find_file(&self, name: &str) -> Result<FileRecord, AppError> {
        self.files
            .get_file(name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", name)))
    }

    /// Called after a file record is created.
    pub async fn upload_hook(&self, record: &FileRecord) -> Result<UploadOutcome, AppError> {
        match &self.orchestrator {
            Some(orchestrator) => orchestrator.offload(record).await,
            None => Ok(UploadOutcome::Skipped(SkipReason::StorageDisabled)),
        }
    }

    /// Called when a file record is removed. Deletes the remote object it references.
    #[tracing::instrument(skip(self, record), fields(file = %record.name))]
    pub async fn delete_hook(&self, record: &FileRecord) -> Result<(), AppError> {
        let Some(storage) = &self.storage else {
            return Ok(());
        };
        let Some(content_hash) = record.content_hash.as_deref() else {
            return Ok(());
        };

        let (key, visibility) = reference::decode(content_hash);
        let Some(key) = key else {
            return Ok(());
        };

        storage.delete(&key, visibility).await?;
        Ok(())
    }

    /// Resolve a reference into a temporary signed URL.
    pub async fn generate_file(
        &self,
        key: Option<&str>,
        file_name: Option<&str>,
    ) -> Result<GenerateFileResponse, AppError> {
        let Some(content_hash) = key.map(str::trim).filter(|k| !k.is_empty()) else {
            return Ok(GenerateFileResponse::Body(KEY_NOT_FOUND.to_string()));
        };
        let storage = self
            .storage
            .as_ref()
            .ok_or_else(|| AppError::Configuration(STORAGE_NOT_ENABLED.to_string()))?;

        let (key, visibility) = reference::decode(content_hash);
        let Some(key) = key else {
            return Ok(GenerateFileResponse::Body(KEY_NOT_FOUND.to_string()));
        };

        let file_name = file_name.map(str::trim).filter(|n| !n.is_empty());
        let url = storage.get_url(&key, file_name, visibility).await?;
        Ok(GenerateFileResponse::Redirect(url))
    }

    pub async fn migrate_existing_files(&self) -> Result<MigrationReport, AppError> {
        self.migrate_with_workers(self.workers).await
    }

    pub async fn migrate_with_workers(&self, workers: usize) -> Result<MigrationReport, AppError> {
        let orchestrator = self
            .orchestrator
            .clone()
            .ok_or_else(|| AppError::Configuration(STORAGE_NOT_ENABLED.to_string()))?;

        MigrationEngine::new(orchestrator, self.files.clone(), workers)
            .run()
            .await
    }

    pub async fn test_connection(&self) -> ConnectionTestResult {
        let Some(storage) = &self.storage else {
            return ConnectionTestResult {
                success: false,
                message: STORAGE_NOT_ENABLED.to_string(),
            };
        };

        let status = storage.test_connection().await;
        if status.ok {
            ConnectionTestResult {
                success: true,
                message: "Connection successful".to_string(),
            }
        } else {
            tracing::warn!(error = ?status.error, "Cloud storage connection test failed");
            ConnectionTestResult {
                success: false,
                message: status
                    .error
                    .unwrap_or_else(|| "Connection failed".to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStorage;
    use offload_core::{InMemoryFileRepository, Visibility};
    use offload_storage::ConnectionStatus;

    fn enabled(storage: Arc<RecordingStorage>, files: Arc<InMemoryFileRepository>) -> CloudStorage {
        CloudStorage::new(
            Some(storage),
            files,
            SitePaths::new("/nonexistent-site"),
            &StorageConfig::default(),
            2,
        )
    }

    fn disabled() -> CloudStorage {
        CloudStorage::new(
            None,
            Arc::new(InMemoryFileRepository::default()),
            SitePaths::new("/nonexistent-site"),
            &StorageConfig::default(),
            2,
        )
    }

    fn offloaded(content_hash: &str) -> FileRecord {
        FileRecord {
            name: "FILE-0001".to_string(),
            file_url: Some("https://storage.googleapis.com/test-public/k".to_string()),
            content_hash: Some(content_hash.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_storage_hooks_are_noops() {
        let cloud = disabled();
        let record = FileRecord {
            name: "FILE-0001".to_string(),
            file_url: Some("/files/a.txt".to_string()),
            ..Default::default()
        };

        assert!(!cloud.is_enabled());
        assert_eq!(
            cloud.upload_hook(&record).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::StorageDisabled)
        );
        cloud.delete_hook(&offloaded("private:k")).await.unwrap();

        let err = cloud.migrate_existing_files().await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));

        let result = cloud.test_connection().await;
        assert!(!result.success);
        assert_eq!(result.message, "Cloud storage is not enabled");
    }

    #[tokio::test]
    async fn test_delete_hook_decodes_reference() {
        let storage = Arc::new(RecordingStorage::new());
        let cloud = enabled(storage.clone(), Arc::new(InMemoryFileRepository::default()));

        cloud
            .delete_hook(&offloaded("public:2025/01/02/File/AB12CD34_a.png"))
            .await
            .unwrap();
        cloud.delete_hook(&offloaded("private:")).await.unwrap();
        let mut local = offloaded("");
        local.content_hash = None;
        cloud.delete_hook(&local).await.unwrap();

        assert_eq!(
            storage.deletes(),
            vec![(
                "2025/01/02/File/AB12CD34_a.png".to_string(),
                Visibility::Public
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_hook_respects_disabled_delete() {
        let storage = Arc::new(RecordingStorage::new().with_delete_enabled(false));
        let cloud = enabled(storage.clone(), Arc::new(InMemoryFileRepository::default()));

        cloud.delete_hook(&offloaded("private:k")).await.unwrap();
        assert!(storage.deletes().is_empty());
        assert_eq!(storage.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_file() {
        let cloud = enabled(
            Arc::new(RecordingStorage::new()),
            Arc::new(InMemoryFileRepository::default()),
        );

        assert_eq!(
            cloud.generate_file(None, None).await.unwrap(),
            GenerateFileResponse::Body("Key not found.".to_string())
        );
        assert_eq!(
            cloud.generate_file(Some("  "), None).await.unwrap(),
            GenerateFileResponse::Body("Key not found.".to_string())
        );
        assert_eq!(
            cloud.generate_file(Some("public:"), None).await.unwrap(),
            GenerateFileResponse::Body("Key not found.".to_string())
        );
        assert_eq!(
            cloud
                .generate_file(Some("private:2025/x/report.pdf"), Some("report.pdf"))
                .await
                .unwrap(),
            GenerateFileResponse::Redirect(
                "https://signed.example.com/private/2025/x/report.pdf?sig=test&file_name=report.pdf"
                    .to_string()
            )
        );
        // Untagged references are private.
        assert_eq!(
            cloud.generate_file(Some("legacy/key.txt"), Some("")).await.unwrap(),
            GenerateFileResponse::Redirect(
                "https://signed.example.com/private/legacy/key.txt?sig=test".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_generate_file_requires_storage() {
        let cloud = disabled();
        assert_eq!(
            cloud.generate_file(None, None).await.unwrap(),
            GenerateFileResponse::Body("Key not found.".to_string())
        );
        let err = cloud
            .generate_file(Some("private:k"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_connection_results() {
        let ok = enabled(
            Arc::new(RecordingStorage::new()),
            Arc::new(InMemoryFileRepository::default()),
        );
        assert_eq!(
            ok.test_connection().await,
            ConnectionTestResult {
                success: true,
                message: "Connection successful".to_string(),
            }
        );

        let failing = enabled(
            Arc::new(
                RecordingStorage::new()
                    .with_connection(ConnectionStatus::failed("AccessDenied: bucket priv")),
            ),
            Arc::new(InMemoryFileRepository::default()),
        );
        let result = failing.test_connection().await;
        assert!(!result.success);
        assert_eq!(result.message, "AccessDenied: bucket priv");

        let silent = enabled(
            Arc::new(RecordingStorage::new().with_connection(ConnectionStatus {
                ok: false,
                error: None,
            })),
            Arc::new(InMemoryFileRepository::default()),
        );
        assert_eq!(silent.test_connection().await.message, "Connection failed");
    }

    #[tokio::test]
    async fn test_find_file() {
        let files = Arc::new(InMemoryFileRepository::new([offloaded("private:k")]));
        let cloud = enabled(Arc::new(RecordingStorage::new()), files);

        assert_eq!(cloud.find_file("FILE-0001").await.unwrap().name, "FILE-0001");
        assert!(matches!(
            cloud.find_file("FILE-9999").await,
            Err(AppError::NotFound(_))
        ));
    }
}
