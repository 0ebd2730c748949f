//! Document metadata operations

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::{AppError, Result};

/// Stored PDF document
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PdfDocument {
    pub id: String,
    pub original_filename: String,
    pub stored_path: String,
    pub page_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl PdfDocument {
    pub fn pages(&self) -> usize {
        self.page_count.max(0) as usize
    }
}

/// Data needed to register a new document
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub original_filename: String,
    pub stored_path: String,
    pub page_count: usize,
}

/// Document repository
pub struct DocumentRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> DocumentRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, id: &str) -> Result<Option<PdfDocument>> {
        let document = sqlx::query_as::<_, PdfDocument>(
            r#"
            SELECT id, original_filename, stored_path, page_count, created_at, updated_at
            FROM pdf_documents
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(document)
    }

    pub async fn create(&self, data: &NewDocument) -> Result<PdfDocument> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO pdf_documents (id, original_filename, stored_path, page_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&data.id)
        .bind(&data.original_filename)
        .bind(&data.stored_path)
        .bind(data.page_count as i64)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await?;

        self.find(&data.id)
            .await?
            .ok_or_else(|| AppError::Internal("Failed to fetch created document".to_string()))
    }

    /// Record a new page count after a structural change.
    pub async fn update_page_count(&self, id: &str, page_count: usize) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE pdf_documents SET page_count = ?, updated_at = ? WHERE id = ?",
        )
        .bind(page_count as i64)
        .bind(&now)
        .bind(id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bump `updated_at` after an in-place edit.
    pub async fn touch(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE pdf_documents SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_pool;

    fn new_document(id: &str) -> NewDocument {
        NewDocument {
            id: id.to_string(),
            original_filename: "report.pdf".to_string(),
            stored_path: format!("/tmp/{}.pdf", id),
            page_count: 3,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = DocumentRepository::new(&pool);

        let created = repo.create(&new_document("doc-1")).await.unwrap();
        assert_eq!(created.page_count, 3);
        assert_eq!(created.pages(), 3);

        let found = repo.find("doc-1").await.unwrap().unwrap();
        assert_eq!(found.original_filename, "report.pdf");
        assert!(repo.find("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_page_count() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = DocumentRepository::new(&pool);
        repo.create(&new_document("doc-1")).await.unwrap();

        assert!(repo.update_page_count("doc-1", 2).await.unwrap());
        assert!(!repo.update_page_count("missing", 2).await.unwrap());
        assert_eq!(repo.find("doc-1").await.unwrap().unwrap().page_count, 2);
    }
}
