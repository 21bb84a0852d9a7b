//! Configuration module
//!
//! Storage configuration is loaded once at the process boundary (API server start, CLI
//! invocation) and passed explicitly to every component. Nothing reads the environment
//! after startup.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::encryption::mask_secret;
use crate::storage_types::StorageBackend;
use crate::AppError;

pub const DEFAULT_SIGNED_URL_EXPIRY_SECS: u64 = 300;
pub const DEFAULT_S3_REGION: &str = "us-east-1";
pub const DEFAULT_IGNORED_OWNER_TYPES: &[&str] = &["Prepared Report", "Data Import"];
const MIGRATION_WORKERS: usize = 4;
const SERVER_PORT: u16 = 4000;

/// S3-compatible provider settings
#[derive(Clone, Default)]
pub struct S3Settings {
    pub public_bucket: String,
    pub private_bucket: String,
    pub region: String,
    pub endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, Spaces)
    pub access_key_id: Option<String>,
    /// Possibly encrypted; resolve with `encryption::resolve_secret`.
    pub secret_access_key: Option<String>,
}

impl fmt::Debug for S3Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Settings")
            .field("public_bucket", &self.public_bucket)
            .field("private_bucket", &self.private_bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &mask_secret(self.secret_access_key.as_deref()),
            )
            .finish()
    }
}

/// Google Cloud Storage settings
#[derive(Clone, Default)]
pub struct GcsSettings {
    pub public_bucket: String,
    pub private_bucket: String,
    /// Service account JSON, possibly encrypted.
    pub credentials_json: Option<String>,
}

impl fmt::Debug for GcsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsSettings")
            .field("public_bucket", &self.public_bucket)
            .field("private_bucket", &self.private_bucket)
            .field(
                "credentials_json",
                &mask_secret(self.credentials_json.as_deref()),
            )
            .finish()
    }
}

/// Cloud storage configuration
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub enabled: bool,
    pub provider: StorageBackend,
    pub s3: S3Settings,
    pub gcs: GcsSettings,
    pub signed_url_expiry_secs: u64,
    /// Optional key prefix prepended to every generated key.
    pub folder_name: Option<String>,
    pub delete_file_from_cloud: bool,
    /// Owner types whose attachments are never offloaded.
    pub ignored_owner_types: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: StorageBackend::S3,
            s3: S3Settings {
                region: DEFAULT_S3_REGION.to_string(),
                ..Default::default()
            },
            gcs: GcsSettings::default(),
            signed_url_expiry_secs: DEFAULT_SIGNED_URL_EXPIRY_SECS,
            folder_name: None,
            delete_file_from_cloud: false,
            ignored_owner_types: DEFAULT_IGNORED_OWNER_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Configuration view safe to return to operators: secrets replaced by a mask.
#[derive(Debug, Clone, Serialize)]
pub struct MaskedStorageConfig {
    pub enabled: bool,
    pub provider: StorageBackend,
    pub s3_public_bucket: String,
    pub s3_private_bucket: String,
    pub s3_region: String,
    pub s3_endpoint: Option<String>,
    pub s3_access_key_id: Option<String>,
    pub s3_secret_access_key: Option<String>,
    pub gcs_public_bucket: String,
    pub gcs_private_bucket: String,
    pub gcs_credentials_json: Option<String>,
    pub signed_url_expiry_secs: u64,
    pub folder_name: Option<String>,
    pub delete_file_from_cloud: bool,
    pub ignored_owner_types: Vec<String>,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let provider = match env::var("CLOUD_STORAGE_PROVIDER") {
            Ok(s) if !s.trim().is_empty() => s
                .parse::<StorageBackend>()
                .map_err(|e| AppError::Configuration(e.to_string()))?,
            _ => StorageBackend::S3,
        };

        let config = StorageConfig {
            enabled: env_bool("CLOUD_STORAGE_ENABLED", false),
            provider,
            s3: S3Settings {
                public_bucket: env::var("S3_PUBLIC_BUCKET").unwrap_or_default(),
                private_bucket: env::var("S3_PRIVATE_BUCKET").unwrap_or_default(),
                region: env::var("S3_REGION")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
                endpoint: env_opt("S3_ENDPOINT"),
                access_key_id: env_opt("S3_ACCESS_KEY_ID"),
                secret_access_key: env_opt("S3_SECRET_ACCESS_KEY"),
            },
            gcs: GcsSettings {
                public_bucket: env::var("GCS_PUBLIC_BUCKET").unwrap_or_default(),
                private_bucket: env::var("GCS_PRIVATE_BUCKET").unwrap_or_default(),
                credentials_json: env_opt("GCS_CREDENTIALS_JSON"),
            },
            signed_url_expiry_secs: env::var("SIGNED_URL_EXPIRY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&secs: &u64| secs > 0)
                .unwrap_or(DEFAULT_SIGNED_URL_EXPIRY_SECS),
            folder_name: env_opt("CLOUD_STORAGE_FOLDER"),
            delete_file_from_cloud: env_bool("DELETE_FILE_FROM_CLOUD", false),
            ignored_owner_types: env::var("IGNORED_OWNER_TYPES")
                .map(|s| {
                    s.split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| {
                    DEFAULT_IGNORED_OWNER_TYPES
                        .iter()
                        .map(|s| s.to_string())
                        .collect()
                }),
        };

        config.validate()?;
        Ok(config)
    }

    /// Both visibility-class buckets must be set for the selected provider; GCS also needs
    /// credentials. A disabled configuration is always valid.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.enabled {
            return Ok(());
        }

        match self.provider {
            StorageBackend::S3 => {
                if self.s3.private_bucket.trim().is_empty() {
                    return Err(AppError::Configuration(
                        "S3 Private Bucket Name is required".to_string(),
                    ));
                }
                if self.s3.public_bucket.trim().is_empty() {
                    return Err(AppError::Configuration(
                        "S3 Public Bucket Name is required".to_string(),
                    ));
                }
            }
            StorageBackend::Gcs => {
                if self.gcs.private_bucket.trim().is_empty() {
                    return Err(AppError::Configuration(
                        "GCS Private Bucket Name is required".to_string(),
                    ));
                }
                if self.gcs.public_bucket.trim().is_empty() {
                    return Err(AppError::Configuration(
                        "GCS Public Bucket Name is required".to_string(),
                    ));
                }
                if self
                    .gcs
                    .credentials_json
                    .as_deref()
                    .map_or(true, |c| c.trim().is_empty())
                {
                    return Err(AppError::Configuration(
                        "GCS Service Account JSON is required".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn signed_url_expiry(&self) -> Duration {
        if self.signed_url_expiry_secs == 0 {
            Duration::from_secs(DEFAULT_SIGNED_URL_EXPIRY_SECS)
        } else {
            Duration::from_secs(self.signed_url_expiry_secs)
        }
    }

    pub fn masked(&self) -> MaskedStorageConfig {
        MaskedStorageConfig {
            enabled: self.enabled,
            provider: self.provider,
            s3_public_bucket: self.s3.public_bucket.clone(),
            s3_private_bucket: self.s3.private_bucket.clone(),
            s3_region: self.s3.region.clone(),
            s3_endpoint: self.s3.endpoint.clone(),
            s3_access_key_id: self.s3.access_key_id.clone(),
            s3_secret_access_key: mask_secret(self.s3.secret_access_key.as_deref()),
            gcs_public_bucket: self.gcs.public_bucket.clone(),
            gcs_private_bucket: self.gcs.private_bucket.clone(),
            gcs_credentials_json: mask_secret(self.gcs.credentials_json.as_deref()),
            signed_url_expiry_secs: self.signed_url_expiry_secs,
            folder_name: self.folder_name.clone(),
            delete_file_from_cloud: self.delete_file_from_cloud,
            ignored_owner_types: self.ignored_owner_types.clone(),
        }
    }
}

/// Application configuration (API server and CLI).
#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    /// Site root of the host application; local files live under `public/files` and
    /// `private/files` below it.
    pub site_path: PathBuf,
    pub migration_workers: usize,
    pub database_url: Option<String>,
    pub server_port: u16,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let storage = StorageConfig::from_env()?;

        Ok(Config {
            storage,
            site_path: env::var("SITE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            migration_workers: env::var("MIGRATION_WORKERS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(MIGRATION_WORKERS),
            database_url: env_opt("DATABASE_URL"),
            server_port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(SERVER_PORT),
            environment: env::var("ENVIRONMENT")
                .or_else(|_| env::var("APP_ENV"))
                .unwrap_or_else(|_| "development".to_string()),
        })
    }

    pub fn database_url(&self) -> Result<&str, AppError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("DATABASE_URL must be set".to_string()))
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
