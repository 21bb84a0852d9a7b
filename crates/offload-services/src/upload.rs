//! Offloading of a single file record

use std::path::Path;
use std::sync::Arc;

use offload_core::models::{FileRecord, FileRecordPatch};
use offload_core::paths::GENERATE_FILE_ENDPOINT;
use offload_core::{AppError, FileRepository, SitePaths, Visibility};
use offload_storage::{detect_content_type, reference, Storage};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Why a record was left as it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    StorageDisabled,
    IgnoredOwnerType,
    NoUrl,
    AlreadyRemote,
    NotLocalUrl,
    UnresolvablePath,
    FileNotFound,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            SkipReason::StorageDisabled => "storage_disabled",
            SkipReason::IgnoredOwnerType => "ignored_owner_type",
            SkipReason::NoUrl => "no_url",
            SkipReason::AlreadyRemote => "already_remote",
            SkipReason::NotLocalUrl => "not_local_url",
            SkipReason::UnresolvablePath => "unresolvable_path",
            SkipReason::FileNotFound => "file_not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The record now points at remote storage; carries the updated record.
    Migrated(FileRecord),
    Skipped(SkipReason),
}

/// Moves one record's local file to remote storage and repoints the record.
///
/// The record is updated only after the object exists remotely, and the local file is
/// removed only after the record update succeeded. A failure at any step before the update
/// leaves the record untouched.
pub struct UploadOrchestrator {
    storage: Arc<dyn Storage>,
    files: Arc<dyn FileRepository>,
    site: SitePaths,
    ignored_owner_types: Vec<String>,
}

impl UploadOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        files: Arc<dyn FileRepository>,
        site: SitePaths,
        ignored_owner_types: Vec<String>,
    ) -> Self {
        Self {
            storage,
            files,
            site,
            ignored_owner_types,
        }
    }

    /// Offload a freshly created record (upload hook path).
    pub async fn offload(&self, record: &FileRecord) -> Result<UploadOutcome, AppError> {
        if let Some(reason) = self.precheck(record) {
            return Ok(UploadOutcome::Skipped(reason));
        }
        self.transfer(record).await
    }

    /// Offload a pre-existing record (migration path). Only the two local URL shapes are
    /// accepted.
    pub async fn offload_existing(&self, record: &FileRecord) -> Result<UploadOutcome, AppError> {
        if let Some(reason) = self.precheck(record) {
            return Ok(UploadOutcome::Skipped(reason));
        }
        if !record.has_local_url() {
            return Ok(UploadOutcome::Skipped(SkipReason::NotLocalUrl));
        }
        self.transfer(record).await
    }

    fn precheck(&self, record: &FileRecord) -> Option<SkipReason> {
        let owner_type = record.attached_to_doctype.as_deref();
        if owner_type.is_some_and(|t| self.ignored_owner_types.iter().any(|i| i == t)) {
            return Some(SkipReason::IgnoredOwnerType);
        }
        if record.url().is_empty() {
            return Some(SkipReason::NoUrl);
        }
        if record.is_empty_or_cloud() || record.is_offloaded() {
            return Some(SkipReason::AlreadyRemote);
        }
        None
    }

    #[tracing::instrument(skip(self, record), fields(file = %record.name))]
    async fn transfer(&self, record: &FileRecord) -> Result<UploadOutcome, AppError> {
        let visibility = record.visibility();
        let Some(local_path) = self.site.resolve(record.url(), record.is_private) else {
            tracing::warn!(file_url = %record.url(), "File URL does not resolve inside the site");
            return Ok(UploadOutcome::Skipped(SkipReason::UnresolvablePath));
        };

        match tokio::fs::metadata(&local_path).await {
            Ok(meta) if meta.is_file() => {}
            _ => {
                tracing::debug!(path = %local_path.display(), "Local file not found");
                return Ok(UploadOutcome::Skipped(SkipReason::FileNotFound));
            }
        }

        let file_name = file_name_for(record, &local_path);
        let key = self
            .storage
            .generate_key(&file_name, record.owner_type(), record.owner_id());
        let content_type = detect_content_type(&local_path).await;

        self.storage
            .upload(&local_path, &key, &content_type, visibility, &file_name)
            .await?;

        let content_hash = reference::encode(&key, visibility);
        let file_url = match visibility {
            Visibility::Private => private_file_url(&content_hash, &file_name),
            Visibility::Public => self
                .storage
                .public_url(&key)
                .unwrap_or_else(|| record.url().to_string()),
        };

        let patch = FileRecordPatch::archived(file_url, content_hash);
        self.files
            .update_file_location(&record.name, &patch)
            .await?;

        if let Err(e) = tokio::fs::remove_file(&local_path).await {
            tracing::warn!(
                error = %e,
                path = %local_path.display(),
                "Failed to remove local copy after offloading"
            );
        }

        tracing::info!(
            key = %key,
            visibility = %visibility,
            content_type = %content_type,
            "File offloaded to cloud storage"
        );

        let mut updated = record.clone();
        updated.apply(&patch);
        Ok(UploadOutcome::Migrated(updated))
    }
}

fn file_name_for(record: &FileRecord, local_path: &Path) -> String {
    match record.display_file_name() {
        "" => local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        name => name.to_string(),
    }
}

/// Everything except unreserved characters and `/` is escaped.
const URL_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Redirect endpoint URL carrying the reference and the download name.
///
/// Persisted in `file_url`, so the escaping must stay stable: key separators are kept.
pub fn private_file_url(content_hash: &str, file_name: &str) -> String {
    format!(
        "{}?key={}&file_name={}",
        GENERATE_FILE_ENDPOINT,
        utf8_percent_encode(content_hash, URL_VALUE),
        utf8_percent_encode(file_name, URL_VALUE)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStorage;
    use offload_core::models::ARCHIVE_FOLDER;
    use offload_core::InMemoryFileRepository;

    fn current_year() -> String {
        chrono::Local::now().format("%Y").to_string()
    }

    struct Fixture {
        _site_dir: tempfile::TempDir,
        site: SitePaths,
        storage: Arc<RecordingStorage>,
        files: Arc<InMemoryFileRepository>,
        orchestrator: UploadOrchestrator,
    }

    fn fixture(storage: RecordingStorage) -> Fixture {
        let site_dir = tempfile::tempdir().unwrap();
        let site = SitePaths::new(site_dir.path());
        std::fs::create_dir_all(site.private_files_dir()).unwrap();
        std::fs::create_dir_all(site.public_files_dir()).unwrap();

        let storage = Arc::new(storage);
        let files = Arc::new(InMemoryFileRepository::default());
        let orchestrator = UploadOrchestrator::new(
            storage.clone(),
            files.clone(),
            site.clone(),
            vec!["Prepared Report".to_string(), "Data Import".to_string()],
        );
        Fixture {
            _site_dir: site_dir,
            site,
            storage,
            files,
            orchestrator,
        }
    }

    fn private_report() -> FileRecord {
        FileRecord {
            name: "FILE-0001".to_string(),
            file_url: Some("/private/files/report.pdf".to_string()),
            is_private: true,
            file_name: Some("report.pdf".to_string()),
            attached_to_doctype: Some("Sales Invoice".to_string()),
            attached_to_name: Some("SINV-0001".to_string()),
            folder: Some("Home".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_private_file_end_to_end() {
        let fx = fixture(RecordingStorage::new());
        let local = fx.site.private_files_dir().join("report.pdf");
        std::fs::write(&local, b"%PDF-1.4\n...").unwrap();
        let record = private_report();
        fx.files.insert(record.clone());

        let outcome = fx.orchestrator.offload(&record).await.unwrap();
        let UploadOutcome::Migrated(updated) = outcome else {
            panic!("expected migration, got {:?}", outcome);
        };

        let stored = fx.files.snapshot("FILE-0001").unwrap();
        assert_eq!(stored, updated);

        let content_hash = stored.content_hash.clone().unwrap();
        assert!(content_hash.starts_with(&format!("private:{}/", current_year())));
        assert!(content_hash.contains("/Sales Invoice/"));
        assert!(content_hash.ends_with("_report.pdf"));

        let file_url = stored.file_url.clone().unwrap();
        assert_eq!(
            file_url,
            format!(
                "/api/method/offload.generate_file?key={}&file_name=report.pdf",
                content_hash.replace(':', "%3A").replace(' ', "%20")
            )
        );
        assert!(file_url.starts_with(&format!(
            "/api/method/offload.generate_file?key=private%3A{}/",
            current_year()
        )));
        assert!(file_url.contains("/Sales%20Invoice/"));
        assert_eq!(stored.folder.as_deref(), Some(ARCHIVE_FOLDER));
        assert_eq!(stored.old_parent.as_deref(), Some(ARCHIVE_FOLDER));

        let uploads = fx.storage.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].content_type, "application/pdf");
        assert_eq!(uploads[0].visibility, Visibility::Private);
        assert_eq!(uploads[0].file_name, "report.pdf");
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn test_public_file_uses_public_url() {
        let fx = fixture(RecordingStorage::new());
        std::fs::write(fx.site.public_files_dir().join("logo.png"), [0x89, 0x50, 0x4E, 0x47]).unwrap();
        let record = FileRecord {
            name: "FILE-0002".to_string(),
            file_url: Some("/files/logo.png".to_string()),
            file_name: Some("logo.png".to_string()),
            ..Default::default()
        };
        fx.files.insert(record.clone());

        fx.orchestrator.offload(&record).await.unwrap();

        let stored = fx.files.snapshot("FILE-0002").unwrap();
        let content_hash = stored.content_hash.unwrap();
        assert!(content_hash.starts_with("public:"));
        assert!(content_hash.contains("/File/"));
        let key = content_hash.trim_start_matches("public:");
        assert_eq!(
            stored.file_url.as_deref(),
            Some(format!("https://storage.googleapis.com/test-public/{}", key).as_str())
        );
        assert_eq!(fx.storage.uploads()[0].content_type, "image/png");
    }

    #[tokio::test]
    async fn test_public_file_keeps_url_without_public_urls() {
        let fx = fixture(RecordingStorage::new().without_public_urls());
        std::fs::write(fx.site.public_files_dir().join("notes.txt"), b"hello").unwrap();
        let record = FileRecord {
            name: "FILE-0003".to_string(),
            file_url: Some("/files/notes.txt".to_string()),
            file_name: Some("notes.txt".to_string()),
            ..Default::default()
        };
        fx.files.insert(record.clone());

        fx.orchestrator.offload(&record).await.unwrap();

        let stored = fx.files.snapshot("FILE-0003").unwrap();
        assert_eq!(stored.file_url.as_deref(), Some("/files/notes.txt"));
        assert!(stored.content_hash.unwrap().starts_with("public:"));
    }

    #[tokio::test]
    async fn test_skip_conditions() {
        let fx = fixture(RecordingStorage::new());

        let mut ignored = private_report();
        ignored.attached_to_doctype = Some("Prepared Report".to_string());
        assert_eq!(
            fx.orchestrator.offload(&ignored).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::IgnoredOwnerType)
        );

        let mut remote = private_report();
        remote.file_url = Some("https://acme.s3.amazonaws.com/x.pdf".to_string());
        assert_eq!(
            fx.orchestrator.offload(&remote).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::AlreadyRemote)
        );

        let mut no_url = private_report();
        no_url.file_url = None;
        assert_eq!(
            fx.orchestrator.offload(&no_url).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::NoUrl)
        );

        assert_eq!(
            fx.orchestrator.offload(&private_report()).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::FileNotFound)
        );

        let mut elsewhere = private_report();
        elsewhere.file_url = Some("https://cdn.example.com/report.pdf".to_string());
        assert_eq!(
            fx.orchestrator.offload_existing(&elsewhere).await.unwrap(),
            UploadOutcome::Skipped(SkipReason::NotLocalUrl)
        );

        assert_eq!(fx.storage.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_leaves_record_untouched() {
        let fx = fixture(RecordingStorage::new().fail_upload_of("report.pdf"));
        let local = fx.site.private_files_dir().join("report.pdf");
        std::fs::write(&local, b"%PDF-1.4").unwrap();
        let record = private_report();
        fx.files.insert(record.clone());

        let err = fx.orchestrator.offload(&record).await.unwrap_err();
        assert!(matches!(err, AppError::Transfer(_)));

        assert_eq!(fx.files.snapshot("FILE-0001").unwrap(), record);
        assert!(local.exists());
    }

    #[tokio::test]
    async fn test_update_failure_keeps_local_file() {
        let fx = fixture(RecordingStorage::new());
        let local = fx.site.private_files_dir().join("report.pdf");
        std::fs::write(&local, b"%PDF-1.4").unwrap();

        // Not inserted in the repository, so the update fails.
        let err = fx.orchestrator.offload(&private_report()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(local.exists());
    }

    #[test]
    fn test_private_file_url_encoding() {
        assert_eq!(
            private_file_url("private:2025/01/02/File/AB12CD34_a b.pdf", "a b.pdf"),
            "/api/method/offload.generate_file?key=private%3A2025/01/02/File/AB12CD34_a%20b.pdf&file_name=a%20b.pdf"
        );
    }
}
