use crate::keys::{KeyGenerator, KeyOverride, SanitizePolicy};
use crate::traits::{ConnectionStatus, Storage, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload,
    Result as ObjectResult,
};
use offload_core::encryption::resolve_secret;
use offload_core::{EncryptionService, StorageConfig};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;

const PUBLIC_URL_BASE: &str = "https://storage.googleapis.com";

/// Google Cloud Storage implementation
///
/// One object store per bucket, each built from the service account JSON on first use.
pub struct GcsStorage {
    public_bucket: String,
    private_bucket: String,
    credentials_json: Option<String>,
    delete_enabled: bool,
    signed_url_expiry: Duration,
    keys: KeyGenerator,
    public_store: OnceCell<GoogleCloudStorage>,
    private_store: OnceCell<GoogleCloudStorage>,
}

impl fmt::Debug for GcsStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsStorage")
            .field("public_bucket", &self.public_bucket)
            .field("private_bucket", &self.private_bucket)
            .field("delete_enabled", &self.delete_enabled)
            .finish_non_exhaustive()
    }
}

impl GcsStorage {
    /// Create a new GcsStorage instance
    ///
    /// The service account JSON is decrypted with `cipher` when it is stored encrypted.
    pub fn new(
        config: &StorageConfig,
        cipher: Option<&EncryptionService>,
        key_override: Option<KeyOverride>,
    ) -> Self {
        let gcs = &config.gcs;
        GcsStorage {
            public_bucket: gcs.public_bucket.trim().to_string(),
            private_bucket: gcs.private_bucket.trim().to_string(),
            credentials_json: gcs
                .credentials_json
                .as_deref()
                .filter(|c| !c.trim().is_empty())
                .map(|c| resolve_secret(cipher, c)),
            delete_enabled: config.delete_file_from_cloud,
            signed_url_expiry: config.signed_url_expiry(),
            keys: KeyGenerator::new(SanitizePolicy::KeepThenUnderscore, config.folder_name.clone())
                .with_override(key_override),
            public_store: OnceCell::new(),
            private_store: OnceCell::new(),
        }
    }

    fn bucket(&self, visibility: Visibility) -> &str {
        match visibility {
            Visibility::Public => &self.public_bucket,
            Visibility::Private => &self.private_bucket,
        }
    }

    async fn store(&self, visibility: Visibility) -> StorageResult<&GoogleCloudStorage> {
        let cell = match visibility {
            Visibility::Public => &self.public_store,
            Visibility::Private => &self.private_store,
        };
        let bucket = self.bucket(visibility);

        cell.get_or_try_init(|| async move {
            if bucket.is_empty() {
                return Err(StorageError::ConfigError(format!(
                    "GCS {} bucket is not configured",
                    visibility
                )));
            }
            let credentials = self.credentials_json.as_deref().ok_or_else(|| {
                StorageError::ConfigError("GCS Service Account JSON is required".to_string())
            })?;

            let store = GoogleCloudStorageBuilder::new()
                .with_bucket_name(bucket)
                .with_service_account_key(credentials)
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;

            tracing::debug!(bucket = %bucket, "GCS client initialized");
            Ok(store)
        })
        .await
    }
}

/// `Content-Disposition` suggesting `file_name` on download.
fn content_disposition(file_name: &str) -> Option<String> {
    if file_name.is_empty() {
        return None;
    }
    Some(format!(
        "inline; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    ))
}

fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Storage for GcsStorage {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        visibility: Visibility,
        file_name: &str,
    ) -> StorageResult<String> {
        let store = self.store(visibility).await?;
        let bucket = self.bucket(visibility);

        let data = tokio::fs::read(local_path).await?;
        let size = data.len() as u64;
        let location = ObjectPath::from(key);

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        if let Some(disposition) = content_disposition(file_name) {
            attributes.insert(Attribute::ContentDisposition, disposition.into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "GCS upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(key.to_string())
    }

    async fn delete(&self, key: &str, visibility: Visibility) -> StorageResult<()> {
        let bucket = self.bucket(visibility);
        if !self.delete_enabled || key.is_empty() || bucket.is_empty() {
            return Ok(());
        }

        let store = self.store(visibility).await?;
        let start = std::time::Instant::now();
        let location = ObjectPath::from(key);

        let result: ObjectResult<_> = store.delete(&location).await;

        match result {
            Ok(()) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS delete successful"
                );
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %bucket, key = %key, "GCS object already absent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    /// The download name comes from the `Content-Disposition` stored at upload time, so
    /// `file_name` is not part of the signature.
    async fn get_url(
        &self,
        key: &str,
        _file_name: Option<&str>,
        visibility: Visibility,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let store = self.store(visibility).await?;
        let location = ObjectPath::from(key);
        let url_result: ObjectResult<_> = store
            .signed_url(Method::GET, &location, self.signed_url_expiry)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        Ok(url)
    }

    fn public_url(&self, key: &str) -> Option<String> {
        if self.public_bucket.is_empty() {
            return None;
        }
        Some(format!(
            "{}/{}/{}",
            PUBLIC_URL_BASE,
            self.public_bucket,
            encode_key(ObjectPath::from(key).as_ref())
        ))
    }

    async fn test_connection(&self) -> ConnectionStatus {
        for visibility in [Visibility::Private, Visibility::Public] {
            let store = match self.store(visibility).await {
                Ok(store) => store,
                Err(e) => return ConnectionStatus::failed(e.to_string()),
            };

            let probe = ObjectPath::from("offload-connection-test");
            if let Err(e) = store.list_with_delimiter(Some(&probe)).await {
                tracing::warn!(
                    error = %e,
                    bucket = %self.bucket(visibility),
                    "GCS connection test failed"
                );
                return ConnectionStatus::failed(format!("{}: {}", self.bucket(visibility), e));
            }
        }
        ConnectionStatus::ok()
    }

    fn generate_key(&self, file_name: &str, owner_type: &str, owner_id: &str) -> String {
        self.keys.generate(file_name, owner_type, owner_id)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Gcs
    }
}
