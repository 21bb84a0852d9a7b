//! Host application integration points
//!
//! The offload services never talk to the host's document store directly. They go through
//! `FileRepository`, which the host (or `offload-db` for the bundled PostgreSQL schema)
//! implements.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::{FileRecord, FileRecordPatch};
use crate::AppError;

/// Read and patch access to file records
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// All records that are not folders.
    async fn list_files(&self) -> Result<Vec<FileRecord>, AppError>;

    async fn get_file(&self, name: &str) -> Result<Option<FileRecord>, AppError>;

    /// Write the location fields of one record in a single update.
    ///
    /// Returns `AppError::NotFound` when no record has that name.
    async fn update_file_location(&self, name: &str, patch: &FileRecordPatch)
        -> Result<(), AppError>;
}

/// Process-local repository, used by tests and dry runs
#[derive(Debug, Default)]
pub struct InMemoryFileRepository {
    records: Mutex<BTreeMap<String, FileRecord>>,
}

impl InMemoryFileRepository {
    pub fn new(records: impl IntoIterator<Item = FileRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().map(|r| (r.name.clone(), r)).collect()),
        }
    }

    pub fn insert(&self, record: FileRecord) {
        self.lock().insert(record.name.clone(), record);
    }

    pub fn snapshot(&self, name: &str) -> Option<FileRecord> {
        self.lock().get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, FileRecord>> {
        // A poisoned map is still structurally valid.
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn list_files(&self) -> Result<Vec<FileRecord>, AppError> {
        Ok(self
            .lock()
            .values()
            .filter(|r| !r.is_folder)
            .cloned()
            .collect())
    }

    async fn get_file(&self, name: &str) -> Result<Option<FileRecord>, AppError> {
        Ok(self.snapshot(name))
    }

    async fn update_file_location(
        &self,
        name: &str,
        patch: &FileRecordPatch,
    ) -> Result<(), AppError> {
        let mut records = self.lock();
        let record = records
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", name)))?;
        record.apply(patch);
        Ok(())
    }
}
