use serde::{Deserialize, Serialize};

use crate::paths::{is_cloud_file_url, is_local_file_url};
use crate::storage_types::Visibility;

/// Archival folder migrated records are moved to.
pub const ARCHIVE_FOLDER: &str = "Home/Attachments";

/// Owner type used for key generation when a record is not attached to anything.
pub const DEFAULT_OWNER_TYPE: &str = "File";

/// File attachment record owned by the host application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct FileRecord {
    pub name: String,
    pub file_url: Option<String>,
    pub is_private: bool,
    pub file_name: Option<String>,
    /// Owner type
    pub attached_to_doctype: Option<String>,
    /// Owner id
    pub attached_to_name: Option<String>,
    /// Encoded reference (`<visibility>:<key>`), set once the file is offloaded.
    pub content_hash: Option<String>,
    pub is_folder: bool,
    pub folder: Option<String>,
    pub old_parent: Option<String>,
}

impl FileRecord {
    pub fn visibility(&self) -> Visibility {
        Visibility::from_is_private(self.is_private)
    }

    /// Trimmed `file_url`, empty when unset.
    pub fn url(&self) -> &str {
        self.file_url.as_deref().map(str::trim).unwrap_or("")
    }

    pub fn has_local_url(&self) -> bool {
        is_local_file_url(self.url())
    }

    /// True when the record has no URL or already points at remote storage.
    pub fn is_empty_or_cloud(&self) -> bool {
        let url = self.url();
        url.is_empty() || is_cloud_file_url(url)
    }

    /// True once a reference has been written for this record.
    pub fn is_offloaded(&self) -> bool {
        self.content_hash
            .as_deref()
            .is_some_and(|h| !h.trim().is_empty())
    }

    pub fn owner_type(&self) -> &str {
        self.attached_to_doctype
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_OWNER_TYPE)
    }

    pub fn owner_id(&self) -> &str {
        self.attached_to_name.as_deref().unwrap_or("")
    }

    pub fn display_file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("")
    }

    /// Apply a location patch in place, mirroring the persisted update.
    pub fn apply(&mut self, patch: &FileRecordPatch) {
        self.file_url = Some(patch.file_url.clone());
        self.folder = Some(patch.folder.clone());
        self.old_parent = Some(patch.old_parent.clone());
        self.content_hash = Some(patch.content_hash.clone());
    }
}

/// Fields rewritten when a file moves to remote storage, persisted in one update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecordPatch {
    pub file_url: String,
    pub folder: String,
    pub old_parent: String,
    pub content_hash: String,
}

impl FileRecordPatch {
    pub fn archived(file_url: String, content_hash: String) -> Self {
        Self {
            file_url,
            folder: ARCHIVE_FOLDER.to_string(),
            old_parent: ARCHIVE_FOLDER.to_string(),
            content_hash,
        }
    }
}
