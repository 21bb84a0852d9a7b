//! Bulk migration of existing local files to remote storage
//!
//! Every non-folder record is classified, and the ones still on local disk are offloaded
//! through the `UploadOrchestrator` by a bounded pool of tokio tasks. Each record runs in its
//! own task: an error or a panic while offloading one file is counted and sampled in the
//! report, and the batch moves on. Counters are reduced by the driving task only.
//!
//! Runs are re-entrant: offloaded records no longer have a local URL, so a second run over
//! the same corpus migrates nothing.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use offload_core::models::{FileRecord, MigrationErrorEntry, MigrationOutcome, MigrationReport};
use offload_core::{AppError, FileRepository};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::upload::{SkipReason, UploadOrchestrator, UploadOutcome};

pub struct MigrationEngine {
    orchestrator: Arc<UploadOrchestrator>,
    files: Arc<dyn FileRepository>,
    workers: usize,
}

impl MigrationEngine {
    pub fn new(
        orchestrator: Arc<UploadOrchestrator>,
        files: Arc<dyn FileRepository>,
        workers: usize,
    ) -> Self {
        Self {
            orchestrator,
            files,
            workers: workers.max(1),
        }
    }

    #[tracing::instrument(skip(self), fields(workers = self.workers))]
    pub async fn run(&self) -> Result<MigrationReport, AppError> {
        let start = std::time::Instant::now();
        let records = self.files.list_files().await?;
        let mut report = MigrationReport::new(records.len());

        tracing::info!(total = records.len(), "Starting migration of existing files");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: JoinSet<(String, MigrationOutcome)> = JoinSet::new();

        for record in records {
            if let Some(outcome) = classify(&record) {
                report.record(outcome);
                continue;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(format!("Worker pool closed: {}", e)))?;

            let orchestrator = self.orchestrator.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let name = record.name.clone();
                let outcome = migrate_one(&orchestrator, &record).await;
                (name, outcome)
            });

            while let Some(joined) = tasks.try_join_next() {
                reduce(&mut report, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            reduce(&mut report, joined);
        }

        tracing::info!(
            total = report.total,
            migrated = report.migrated,
            skipped = report.skipped,
            errors = report.skipped_other,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Migration finished"
        );

        Ok(report)
    }
}

/// Outcome for records that never reach the orchestrator.
fn classify(record: &FileRecord) -> Option<MigrationOutcome> {
    if record.is_empty_or_cloud() {
        Some(MigrationOutcome::SkippedNoUrlOrCloud)
    } else if !record.has_local_url() {
        Some(MigrationOutcome::SkippedNotLocalUrl)
    } else {
        None
    }
}

async fn migrate_one(orchestrator: &UploadOrchestrator, record: &FileRecord) -> MigrationOutcome {
    let result = AssertUnwindSafe(orchestrator.offload_existing(record))
        .catch_unwind()
        .await;

    let error = match result {
        Ok(Ok(UploadOutcome::Migrated(_))) => return MigrationOutcome::Migrated,
        Ok(Ok(UploadOutcome::Skipped(SkipReason::FileNotFound))) => {
            return MigrationOutcome::SkippedFileNotFound
        }
        Ok(Ok(UploadOutcome::Skipped(_))) => return MigrationOutcome::SkippedOther,
        Ok(Err(e)) => {
            tracing::error!(
                file = %record.name,
                file_url = %record.url(),
                error = %e,
                details = %e.detailed_message(),
                "Failed to migrate file"
            );
            e.to_string()
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(
                file = %record.name,
                file_url = %record.url(),
                panic = %message,
                "Migration task panicked"
            );
            message
        }
    };

    MigrationOutcome::Failed(MigrationErrorEntry {
        file: record.name.clone(),
        error,
    })
}

fn reduce(
    report: &mut MigrationReport,
    joined: Result<(String, MigrationOutcome), tokio::task::JoinError>,
) {
    match joined {
        Ok((_, outcome)) => report.record(outcome),
        Err(e) => {
            // Panics are caught inside the task; this is a cancelled task.
            tracing::error!(error = %e, "Migration task did not complete");
            report.record(MigrationOutcome::SkippedOther);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingStorage;
    use offload_core::{InMemoryFileRepository, SitePaths};

    struct Corpus {
        _site_dir: tempfile::TempDir,
        storage: Arc<RecordingStorage>,
        files: Arc<InMemoryFileRepository>,
        engine: MigrationEngine,
    }

    fn local_record(name: &str, file_name: &str, is_private: bool) -> FileRecord {
        let prefix = if is_private { "/private/files" } else { "/files" };
        FileRecord {
            name: name.to_string(),
            file_url: Some(format!("{}/{}", prefix, file_name)),
            is_private,
            file_name: Some(file_name.to_string()),
            attached_to_doctype: Some("Sales Invoice".to_string()),
            attached_to_name: Some("SINV-0001".to_string()),
            ..Default::default()
        }
    }

    /// Records `n` local files on disk plus the given extra records, migrated with `workers`.
    fn corpus(
        storage: RecordingStorage,
        n: usize,
        extra: Vec<FileRecord>,
        workers: usize,
    ) -> Corpus {
        let site_dir = tempfile::tempdir().unwrap();
        let site = SitePaths::new(site_dir.path());
        std::fs::create_dir_all(site.private_files_dir()).unwrap();
        std::fs::create_dir_all(site.public_files_dir()).unwrap();

        let files = Arc::new(InMemoryFileRepository::default());
        for i in 0..n {
            let is_private = i % 2 == 0;
            let file_name = format!("doc-{}.txt", i);
            let record = local_record(&format!("FILE-{:04}", i), &file_name, is_private);
            let dir = if is_private {
                site.private_files_dir()
            } else {
                site.public_files_dir()
            };
            std::fs::write(dir.join(&file_name), format!("document {}", i)).unwrap();
            files.insert(record);
        }
        for record in extra {
            files.insert(record);
        }

        let storage = Arc::new(storage);
        let orchestrator = Arc::new(UploadOrchestrator::new(
            storage.clone(),
            files.clone(),
            site,
            vec!["Prepared Report".to_string()],
        ));
        let engine = MigrationEngine::new(orchestrator, files.clone(), workers);

        Corpus {
            _site_dir: site_dir,
            storage,
            files,
            engine,
        }
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let c = corpus(RecordingStorage::new(), 6, vec![], 3);

        let first = c.engine.run().await.unwrap();
        assert_eq!(first.total, 6);
        assert_eq!(first.migrated, 6);
        assert_eq!(first.skipped, 0);

        let second = c.engine.run().await.unwrap();
        assert_eq!(second.total, 6);
        assert_eq!(second.migrated, 0);
        assert_eq!(second.skipped_no_url_or_cloud, 6);
        assert_eq!(c.storage.uploads().len(), 6);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_batch() {
        let c = corpus(
            RecordingStorage::new().fail_upload_of("doc-2.txt"),
            5,
            vec![],
            2,
        );

        let report = c.engine.run().await.unwrap();
        assert_eq!(report.total, 5);
        assert_eq!(report.migrated, 4);
        assert_eq!(report.skipped_other, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].file, "FILE-0002");
        assert!(report.errors[0].error.contains("simulated failure"));

        let failed = c.files.snapshot("FILE-0002").unwrap();
        assert_eq!(failed.file_url.as_deref(), Some("/private/files/doc-2.txt"));
        assert!(failed.content_hash.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let c = corpus(
            RecordingStorage::new().panic_on_upload_of("doc-1.txt"),
            4,
            vec![],
            4,
        );

        let report = c.engine.run().await.unwrap();
        assert_eq!(report.migrated, 3);
        assert_eq!(report.skipped_other, 1);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].file, "FILE-0001");
        assert!(report.errors[0].error.starts_with("panic"));
    }

    #[tokio::test]
    async fn test_skip_categories() {
        let mut cloud = local_record("FILE-CLOUD", "x.pdf", true);
        cloud.file_url = Some("https://storage.googleapis.com/acme/x.pdf".to_string());
        let mut no_url = local_record("FILE-NOURL", "y.pdf", true);
        no_url.file_url = None;
        let mut external = local_record("FILE-EXT", "z.pdf", false);
        external.file_url = Some("https://cdn.example.com/z.pdf".to_string());
        let missing = local_record("FILE-MISSING", "gone.pdf", true);
        let mut ignored = local_record("FILE-IGNORED", "prepared.pdf", true);
        ignored.attached_to_doctype = Some("Prepared Report".to_string());
        let folder = FileRecord {
            name: "Home/Attachments".to_string(),
            is_folder: true,
            ..Default::default()
        };

        let c = corpus(
            RecordingStorage::new(),
            2,
            vec![cloud, no_url, external, missing, ignored, folder],
            1,
        );

        let report = c.engine.run().await.unwrap();
        assert_eq!(report.total, 7);
        assert_eq!(report.migrated, 2);
        assert_eq!(report.skipped_no_url_or_cloud, 2);
        assert_eq!(report.skipped_not_local_url, 1);
        assert_eq!(report.skipped_file_not_found, 1);
        assert_eq!(report.skipped_other, 1);
        assert_eq!(report.skipped, 5);
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn test_error_samples_capped_at_ten() {
        let mut storage = RecordingStorage::new();
        for i in 0..12 {
            storage = storage.fail_upload_of(&format!("doc-{}.txt", i));
        }
        let c = corpus(storage, 12, vec![], 4);

        let report = c.engine.run().await.unwrap();
        assert_eq!(report.migrated, 0);
        assert_eq!(report.skipped_other, 12);
        assert_eq!(report.errors.len(), 10);
    }
}
