//! Overlay edit history

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::engine::BoundingBox;
use crate::error::Result;

/// What an edit targeted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Block,
    Word,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Block => "block",
            TargetKind::Word => "word",
        }
    }
}

/// One recorded overlay edit
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OverlayRecord {
    pub id: String,
    pub document_id: String,
    pub page_number: i64,
    pub target_id: String,
    pub target_kind: String,
    pub original_text: String,
    pub edited_text: String,
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewOverlay<'a> {
    pub document_id: &'a str,
    pub page_number: usize,
    pub target_id: &'a str,
    pub target_kind: TargetKind,
    pub original_text: &'a str,
    pub edited_text: &'a str,
    pub bbox: BoundingBox,
}

/// Overlay history repository
pub struct OverlayRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OverlayRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, data: &NewOverlay<'_>) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO pdf_overlays (id, document_id, page_number, target_id, target_kind,
                                      original_text, edited_text, x0, y0, x1, y1, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(data.document_id)
        .bind(data.page_number as i64)
        .bind(data.target_id)
        .bind(data.target_kind.as_str())
        .bind(data.original_text)
        .bind(data.edited_text)
        .bind(data.bbox.x0 as f64)
        .bind(data.bbox.y0 as f64)
        .bind(data.bbox.x1 as f64)
        .bind(data.bbox.y1 as f64)
        .bind(&now)
        .execute(self.pool)
        .await?;

        Ok(id)
    }

    /// Edits for a document in the order they were applied
    pub async fn list_for_document(&self, document_id: &str) -> Result<Vec<OverlayRecord>> {
        let records = sqlx::query_as::<_, OverlayRecord>(
            r#"
            SELECT id, document_id, page_number, target_id, target_kind,
                   original_text, edited_text, x0, y0, x1, y1, created_at
            FROM pdf_overlays
            WHERE document_id = ?
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(document_id)
        .fetch_all(self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, DocumentRepository, NewDocument};

    #[tokio::test]
    async fn test_record_and_list() {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        DocumentRepository::new(&pool)
            .create(&NewDocument {
                id: "doc".to_string(),
                original_filename: "a.pdf".to_string(),
                stored_path: "/tmp/a.pdf".to_string(),
                page_count: 1,
            })
            .await
            .unwrap();

        let repo = OverlayRepository::new(&pool);
        for (target, text) in [("page-1-block-1", "first"), ("page-1-block-1-word-1", "second")] {
            repo.record(&NewOverlay {
                document_id: "doc",
                page_number: 1,
                target_id: target,
                target_kind: if target.contains("word") {
                    TargetKind::Word
                } else {
                    TargetKind::Block
                },
                original_text: "Hello",
                edited_text: text,
                bbox: BoundingBox::new(1.0, 2.0, 3.0, 4.0),
            })
            .await
            .unwrap();
        }

        let records = repo.list_for_document("doc").await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].edited_text, "first");
        assert_eq!(records[1].target_kind, "word");
        assert_eq!(records[1].x1, 3.0);
        assert!(repo.list_for_document("other").await.unwrap().is_empty());
    }
}
