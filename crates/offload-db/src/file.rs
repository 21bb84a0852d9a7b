use async_trait::async_trait;
use offload_core::{
    models::{FileRecord, FileRecordPatch},
    AppError, FileRepository,
};
use sqlx::{PgPool, Postgres};

const FILE_COLUMNS: &str = "name, file_url, is_private, file_name, attached_to_doctype, \
     attached_to_name, content_hash, is_folder, folder, old_parent";

/// Repository for file attachment records
#[derive(Clone)]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    /// List every non-folder file record
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    async fn list_files(&self) -> Result<Vec<FileRecord>, AppError> {
        let files = sqlx::query_as::<Postgres, FileRecord>(&format!(
            "SELECT {} FROM files WHERE is_folder = FALSE ORDER BY name ASC",
            FILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select", db.record_id = %name))]
    async fn get_file(&self, name: &str) -> Result<Option<FileRecord>, AppError> {
        let file = sqlx::query_as::<Postgres, FileRecord>(&format!(
            "SELECT {} FROM files WHERE name = $1",
            FILE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    /// Repoint a record at its remote copy in a single statement
    #[tracing::instrument(skip(self, patch), fields(db.table = "files", db.operation = "update", db.record_id = %name))]
    async fn update_file_location(
        &self,
        name: &str,
        patch: &FileRecordPatch,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET file_url = $1, folder = $2, old_parent = $3, content_hash = $4, updated_at = NOW()
            WHERE name = $5
            "#,
        )
        .bind(&patch.file_url)
        .bind(&patch.folder)
        .bind(&patch.old_parent)
        .bind(&patch.content_hash)
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("File {} not found", name)));
        }

        Ok(())
    }
}
