//! In-process storage fake for tests
//!
//! `RecordingStorage` follows the backend contract (delete no-ops, key layout) without any
//! network, and records every call that would have reached the provider.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use offload_storage::{
    ConnectionStatus, KeyGenerator, SanitizePolicy, Storage, StorageBackend, StorageError,
    StorageResult, Visibility,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCall {
    pub local_path: PathBuf,
    pub key: String,
    pub content_type: String,
    pub visibility: Visibility,
    pub file_name: String,
}

#[derive(Debug)]
pub struct RecordingStorage {
    keys: KeyGenerator,
    delete_enabled: bool,
    public_urls: bool,
    connection: ConnectionStatus,
    fail_uploads: HashSet<String>,
    panic_uploads: HashSet<String>,
    uploads: Mutex<Vec<UploadCall>>,
    deletes: Mutex<Vec<(String, Visibility)>>,
    network_calls: AtomicUsize,
}

impl Default for RecordingStorage {
    fn default() -> Self {
        Self {
            keys: KeyGenerator::new(SanitizePolicy::AsciiSafe, None),
            delete_enabled: true,
            public_urls: true,
            connection: ConnectionStatus::ok(),
            fail_uploads: HashSet::new(),
            panic_uploads: HashSet::new(),
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            network_calls: AtomicUsize::new(0),
        }
    }
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delete_enabled(mut self, enabled: bool) -> Self {
        self.delete_enabled = enabled;
        self
    }

    /// Behave like a backend without stable public URLs.
    pub fn without_public_urls(mut self) -> Self {
        self.public_urls = false;
        self
    }

    pub fn with_connection(mut self, status: ConnectionStatus) -> Self {
        self.connection = status;
        self
    }

    /// Uploads of `file_name` fail with a transfer error.
    pub fn fail_upload_of(mut self, file_name: &str) -> Self {
        self.fail_uploads.insert(file_name.to_string());
        self
    }

    /// Uploads of `file_name` panic.
    pub fn panic_on_upload_of(mut self, file_name: &str) -> Self {
        self.panic_uploads.insert(file_name.to_string());
        self
    }

    pub fn uploads(&self) -> Vec<UploadCall> {
        self.uploads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn deletes(&self) -> Vec<(String, Visibility)> {
        self.deletes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn network_calls(&self) -> usize {
        self.network_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn upload(
        &self,
        local_path: &Path,
        key: &str,
        content_type: &str,
        visibility: Visibility,
        file_name: &str,
    ) -> StorageResult<String> {
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_uploads.contains(file_name) {
            panic!("simulated backend crash for {}", file_name);
        }
        if self.fail_uploads.contains(file_name) {
            return Err(StorageError::UploadFailed(format!(
                "simulated failure for {}",
                file_name
            )));
        }
        if !local_path.is_file() {
            return Err(StorageError::NotFound(local_path.display().to_string()));
        }

        self.uploads
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(UploadCall {
                local_path: local_path.to_path_buf(),
                key: key.to_string(),
                content_type: content_type.to_string(),
                visibility,
                file_name: file_name.to_string(),
            });
        Ok(key.to_string())
    }

    async fn delete(&self, key: &str, visibility: Visibility) -> StorageResult<()> {
        if !self.delete_enabled || key.is_empty() {
            return Ok(());
        }
        self.network_calls.fetch_add(1, Ordering::SeqCst);
        self.deletes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((key.to_string(), visibility));
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
        let mut url = format!("https://signed.example.com/{}/{}?sig=test", visibility, key);
        if let Some(name) = file_name {
            url.push_str(&format!("&file_name={}", name));
        }
        Ok(url)
    }

    fn public_url(&self, key: &str) -> Option<String> {
        self.public_urls
            .then(|| format!("https://storage.googleapis.com/test-public/{}", key))
    }

    async fn test_connection(&self) -> ConnectionStatus {
        self.connection.clone()
    }

    fn generate_key(&self, file_name: &str, owner_type: &str, owner_id: &str) -> String {
        self.keys.generate(file_name, owner_type, owner_id)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
