use crate::keys::{KeyGenerator, KeyOverride, SanitizePolicy};
use crate::traits::{ConnectionStatus, Storage, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use offload_core::encryption::resolve_secret;
use offload_core::{EncryptionService, StorageConfig};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;

/// S3 storage implementation
///
/// Works against AWS S3 and S3-compatible providers (MinIO, R2, Spaces) through a custom
/// endpoint. The SDK client is built on first use.
pub struct S3Storage {
    public_bucket: String,
    private_bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    credentials: Option<(String, String)>,
    delete_enabled: bool,
    signed_url_expiry: Duration,
    keys: KeyGenerator,
    client: OnceCell<Client>,
}

impl fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Storage")
            .field("public_bucket", &self.public_bucket)
            .field("private_bucket", &self.private_bucket)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("delete_enabled", &self.delete_enabled)
            .finish_non_exhaustive()
    }
}

impl S3Storage {
    /// Create a new S3Storage instance
    ///
    /// The secret access key is decrypted with `cipher` when it is stored encrypted. Without
    /// an explicit key pair the SDK's default credential chain is used.
    pub fn new(
        config: &StorageConfig,
        cipher: Option<&EncryptionService>,
        key_override: Option<KeyOverride>,
    ) -> Self {
        let s3 = &config.s3;
        let credentials = match (&s3.access_key_id, &s3.secret_access_key) {
            (Some(key), Some(secret)) => Some((key.clone(), resolve_secret(cipher, secret))),
            _ => None,
        };

        S3Storage {
            public_bucket: s3.public_bucket.trim().to_string(),
            private_bucket: s3.private_bucket.trim().to_string(),
            region: s3.region.clone(),
            endpoint_url: s3
                .endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            credentials,
            delete_enabled: config.delete_file_from_cloud,
            signed_url_expiry: config.signed_url_expiry(),
            keys: KeyGenerator::new(SanitizePolicy::AsciiSafe, config.folder_name.clone())
                .with_override(key_override),
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async move {
                let region_provider =
                    RegionProviderChain::first_try(aws_config::Region::new(self.region.clone()));
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(region_provider)
                    .load()
                    .await;

                let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
                if let Some((access_key, secret_key)) = &self.credentials {
                    builder = builder.credentials_provider(Credentials::new(
                        access_key,
                        secret_key,
                        None,
                        None,
                        "offload-config",
                    ));
                }
                if let Some(endpoint) = &self.endpoint_url {
                    // Path-style addressing is required for MinIO and most compatibles
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }

                tracing::debug!(region = %self.region, "S3 client initialized");
                Client::from_conf(builder.build())
            })
            .await
    }

    fn bucket(&self, visibility: Visibility) -> &str {
        match visibility {
            Visibility::Public => &self.public_bucket,
            Visibility::Private => &self.private_bucket,
        }
    }

    async fn head_bucket(&self, bucket: &str) -> Result<(), String> {
        if bucket.is_empty() {
            return Err("Bucket name is not configured".to_string());
        }
        self.client()
            .await
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| format!("{}: {}", bucket, DisplayErrorContext(&e)))
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        visibility: Visibility,
        file_name: &str,
    ) -> StorageResult<String> {
        let bucket = self.bucket(visibility);
        if bucket.is_empty() {
            return Err(StorageError::ConfigError(format!(
                "S3 {} bucket is not configured",
                visibility
            )));
        }

        let size = tokio::fs::metadata(local_path).await?.len();
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::UploadFailed(e.to_string()))?;

        let start = std::time::Instant::now();

        self.client()
            .await
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .metadata("file_name", file_name)
            .set_acl((visibility == Visibility::Public).then_some(ObjectCannedAcl::PublicRead))
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            content_type = %content_type,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(key.to_string())
    }

    async fn delete(&self, key: &str, visibility: Visibility) -> StorageResult<()> {
        let bucket = self.bucket(visibility);
        if !self.delete_enabled || key.is_empty() || bucket.is_empty() {
            return Ok(());
        }

        let start = std::time::Instant::now();

        let result = self
            .client()
            .await
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => {}
            Err(e) if e.as_service_error().and_then(|se| se.code()) == Some("NoSuchKey") => {
                tracing::debug!(bucket = %bucket, key = %key, "S3 object already absent");
                return Ok(());
            }
            Err(e) => {
                tracing::error!(
                    error = %DisplayErrorContext(&e),
                    bucket = %bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn get_url(
        &self,
        key: &str,
        file_name: Option<&str>,
        visibility: Visibility,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }

        let presigning_config = PresigningConfig::expires_in(self.signed_url_expiry)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let presigned_request = self
            .client()
            .await
            .get_object()
            .bucket(self.bucket(visibility))
            .key(key)
            .set_response_content_disposition(
                file_name
                    .filter(|n| !n.is_empty())
                    .map(|n| format!("filename={}", n)),
            )
            .presigned(presigning_config)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        Ok(presigned_request.uri().to_string())
    }

    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn public_url(&self, key: &str) -> Option<String> {
        if self.public_bucket.is_empty() {
            return None;
        }
        Some(match &self.endpoint_url {
            Some(endpoint) => format!("{}/{}/{}", endpoint, self.public_bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.public_bucket, self.region, key
            ),
        })
    }

    async fn test_connection(&self) -> ConnectionStatus {
        for bucket in [&self.private_bucket, &self.public_bucket] {
            if let Err(e) = self.head_bucket(bucket).await {
                tracing::warn!(error = %e, "S3 connection test failed");
                return ConnectionStatus::failed(e);
            }
        }
        ConnectionStatus::ok()
    }

    fn generate_key(&self, file_name: &str, owner_type: &str, owner_id: &str) -> String {
        self.keys.generate(file_name, owner_type, owner_id)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
