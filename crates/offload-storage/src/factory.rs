#[cfg(feature = "storage-gcs")]
use crate::GcsStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{KeyOverride, Storage, StorageBackend, StorageError, StorageResult};
use offload_core::{EncryptionService, StorageConfig};
use std::sync::Arc;

/// Create the storage backend for the configured provider.
///
/// Returns `Ok(None)` when cloud storage is disabled. The configuration is validated first,
/// so a missing bucket or credential is reported here rather than on first transfer.
pub fn create_storage(
    config: &StorageConfig,
    cipher: Option<&EncryptionService>,
    key_override: Option<KeyOverride>,
) -> StorageResult<Option<Arc<dyn Storage>>> {
    if !config.enabled {
        return Ok(None);
    }

    config
        .validate()
        .map_err(|e| StorageError::ConfigError(e.to_string()))?;

    match config.provider {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let storage = S3Storage::new(config, cipher, key_override);
            tracing::info!(
                public_bucket = %config.s3.public_bucket,
                private_bucket = %config.s3.private_bucket,
                "Using S3 storage backend"
            );
            Ok(Some(Arc::new(storage)))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-gcs")]
        StorageBackend::Gcs => {
            let storage = GcsStorage::new(config, cipher, key_override);
            tracing::info!(
                public_bucket = %config.gcs.public_bucket,
                private_bucket = %config.gcs.private_bucket,
                "Using GCS storage backend"
            );
            Ok(Some(Arc::new(storage)))
        }

        #[cfg(not(feature = "storage-gcs"))]
        StorageBackend::Gcs => Err(StorageError::ConfigError(
            "GCS storage backend not available (storage-gcs feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-s3", feature = "storage-gcs"))]
mod tests {
    use super::*;
    use offload_core::{GcsSettings, S3Settings};

    #[test]
    fn test_disabled_yields_no_backend() {
        let storage = create_storage(&StorageConfig::default(), None, None).unwrap();
        assert!(storage.is_none());
    }

    #[test]
    fn test_dispatch_by_provider() {
        let s3 = StorageConfig {
            enabled: true,
            s3: S3Settings {
                public_bucket: "pub".to_string(),
                private_bucket: "priv".to_string(),
                region: "us-east-1".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let storage = create_storage(&s3, None, None).unwrap().unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::S3);

        let gcs = StorageConfig {
            enabled: true,
            provider: StorageBackend::Gcs,
            gcs: GcsSettings {
                public_bucket: "pub".to_string(),
                private_bucket: "priv".to_string(),
                credentials_json: Some("{}".to_string()),
            },
            ..Default::default()
        };
        let storage = create_storage(&gcs, None, None).unwrap().unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Gcs);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = StorageConfig {
            enabled: true,
            provider: StorageBackend::Gcs,
            ..Default::default()
        };
        let err = create_storage(&config, None, None).err().unwrap();
        assert!(matches!(err, StorageError::ConfigError(_)));
    }
}
