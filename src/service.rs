//! Document service
//!
//! Resolves document handles and page numbers, serializes mutations per
//! document, drives the engine and keeps the render cache and metadata in
//! step with every change.

use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{
    DocumentRepository, NewDocument, NewOverlay, OverlayRecord, OverlayRepository, PdfDocument,
    TargetKind,
};
use crate::engine::error::check_page;
use crate::engine::writer::{parse_page_range, VALID_ANGLES};
use crate::engine::{EngineError, PdfEngine, TextMap};
use crate::error::Result;
use crate::locks::DocumentLocks;
use crate::storage::FileStore;

/// A file received over the upload boundary
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Declared as PDF by name or content type, and carrying the PDF magic.
    pub fn is_pdf(&self) -> bool {
        let named = self
            .filename
            .as_deref()
            .map(|name| name.to_ascii_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        let typed = self
            .content_type
            .as_deref()
            .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);
        (named || typed) && self.bytes.starts_with(b"%PDF")
    }

    /// Looser check for merge sources: PDF content type or PDF magic.
    pub fn is_pdf_like(&self) -> bool {
        let typed = self
            .content_type
            .as_deref()
            .map(|ct| ct.eq_ignore_ascii_case("application/pdf"))
            .unwrap_or(false);
        typed || self.bytes.starts_with(b"%PDF")
    }

    fn display_name(&self) -> String {
        self.filename
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| "document.pdf".to_string())
    }
}

/// Document plus the path of its current bytes
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub record: PdfDocument,
    pub path: PathBuf,
}

impl ResolvedDocument {
    pub fn check_page(&self, page_number: usize) -> Result<()> {
        Ok(check_page(page_number, self.record.pages())?)
    }
}

#[derive(Clone)]
pub struct DocumentService {
    db: SqlitePool,
    files: FileStore,
    engine: PdfEngine,
    locks: DocumentLocks,
}

impl DocumentService {
    pub fn new(db: SqlitePool, files: FileStore, engine: PdfEngine) -> Self {
        Self {
            db,
            files,
            engine,
            locks: DocumentLocks::new(),
        }
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    // ------------------------------------------------------------------
    // Addressing
    // ------------------------------------------------------------------

    pub async fn get(&self, id: &str) -> Result<PdfDocument> {
        DocumentRepository::new(&self.db)
            .find(id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("PDF document {}", id)).into())
    }

    /// Resolve a handle to its metadata and an existing file.
    pub async fn resolve(&self, id: &str) -> Result<ResolvedDocument> {
        let record = self.get(id).await?;
        let path = self.files.path_for_document(id).await?;
        Ok(ResolvedDocument { record, path })
    }

    /// Resolve a handle and validate a page number against its page count.
    pub async fn resolve_page(&self, id: &str, page_number: usize) -> Result<ResolvedDocument> {
        let doc = self.resolve(id).await?;
        doc.check_page(page_number)?;
        Ok(doc)
    }

    // ------------------------------------------------------------------
    // Upload and download
    // ------------------------------------------------------------------

    pub async fn upload(&self, file: UploadedFile) -> Result<PdfDocument> {
        if !file.is_pdf() {
            return Err(EngineError::UnsupportedInput("Only PDF files are allowed".to_string()).into());
        }

        let page_count = self.engine.page_count_of(file.bytes.clone()).await?;
        let id = Uuid::new_v4().to_string();
        self.register(&id, &file.display_name(), &file.bytes, page_count)
            .await
    }

    async fn register(
        &self,
        id: &str,
        original_filename: &str,
        bytes: &[u8],
        page_count: usize,
    ) -> Result<PdfDocument> {
        let path = self.files.save_document(id, bytes).await?;
        let record = self.create_record(id, original_filename, &path, page_count).await?;
        info!("Stored document {} ({} pages)", id, page_count);
        Ok(record)
    }

    async fn create_record(
        &self,
        id: &str,
        original_filename: &str,
        path: &Path,
        page_count: usize,
    ) -> Result<PdfDocument> {
        DocumentRepository::new(&self.db)
            .create(&NewDocument {
                id: id.to_string(),
                original_filename: original_filename.to_string(),
                stored_path: path.to_string_lossy().into_owned(),
                page_count,
            })
            .await
    }

    pub async fn download(&self, id: &str) -> Result<(PdfDocument, Vec<u8>)> {
        let record = self.get(id).await?;
        let bytes = self.files.read_document(id).await?;
        Ok((record, bytes))
    }

    pub async fn overlays(&self, id: &str) -> Result<Vec<OverlayRecord>> {
        self.get(id).await?;
        OverlayRepository::new(&self.db).list_for_document(id).await
    }

    // ------------------------------------------------------------------
    // Page reads
    // ------------------------------------------------------------------

    pub async fn text_map(&self, id: &str, page_number: usize) -> Result<TextMap> {
        let doc = self.resolve_page(id, page_number).await?;
        Ok(self
            .engine
            .text_map(doc.path, id.to_string(), page_number)
            .await?)
    }

    /// Cached PNG if present, else render and populate the cache.
    ///
    /// A miss renders under the document lock, so an edit can never slip in
    /// between reading the bytes and caching their image.
    pub async fn page_image(&self, id: &str, page_number: usize) -> Result<Vec<u8>> {
        self.resolve_page(id, page_number).await?;

        if let Some(png) = self.files.read_render_cache(id, page_number).await {
            debug!("Render cache hit for {} page {}", id, page_number);
            return Ok(png);
        }

        let _guard = self.locks.acquire(id).await;
        // Another request may have filled the cache while we waited
        if let Some(png) = self.files.read_render_cache(id, page_number).await {
            return Ok(png);
        }
        // Pages may have been deleted while we waited
        let doc = self.resolve_page(id, page_number).await?;

        let png = self.engine.render(doc.path, page_number).await?;
        self.files.write_render_cache(id, page_number, &png).await?;
        Ok(png)
    }

    // ------------------------------------------------------------------
    // Overlay edits
    // ------------------------------------------------------------------

    /// Replace a block's text and return the recomputed text map.
    pub async fn edit_block(
        &self,
        id: &str,
        page_number: usize,
        block_id: &str,
        new_text: &str,
    ) -> Result<TextMap> {
        let doc = self.resolve_page(id, page_number).await?;
        let _guard = self.locks.acquire(id).await;

        let map = self
            .engine
            .text_map(doc.path.clone(), id.to_string(), page_number)
            .await?;
        let block = map.find_block(block_id).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Block {} on page {} of document {}",
                block_id, page_number, id
            ))
        })?;

        self.engine
            .edit_block(doc.path.clone(), page_number, block.bbox, new_text.to_string())
            .await?;
        self.after_edit(id, page_number, block_id, TargetKind::Block, &block.text, new_text, block.bbox)
            .await?;

        Ok(self
            .engine
            .text_map(doc.path, id.to_string(), page_number)
            .await?)
    }

    /// Replace a word's text and return the recomputed text map.
    pub async fn edit_word(
        &self,
        id: &str,
        page_number: usize,
        word_id: &str,
        new_text: &str,
    ) -> Result<TextMap> {
        let doc = self.resolve_page(id, page_number).await?;
        let _guard = self.locks.acquire(id).await;

        let map = self
            .engine
            .text_map(doc.path.clone(), id.to_string(), page_number)
            .await?;
        let word = map.find_word(word_id).cloned().ok_or_else(|| {
            EngineError::NotFound(format!(
                "Word {} on page {}. Available word ids include: {:?}",
                word_id,
                page_number,
                map.sample_word_ids(5)
            ))
        })?;

        self.engine
            .edit_word(doc.path.clone(), page_number, word.bbox, new_text.to_string(), None)
            .await?;
        self.after_edit(id, page_number, &word.id, TargetKind::Word, &word.text, new_text, word.bbox)
            .await?;

        Ok(self
            .engine
            .text_map(doc.path, id.to_string(), page_number)
            .await?)
    }

    #[allow(clippy::too_many_arguments)]
    async fn after_edit(
        &self,
        id: &str,
        page_number: usize,
        target_id: &str,
        target_kind: TargetKind,
        original_text: &str,
        edited_text: &str,
        bbox: crate::engine::BoundingBox,
    ) -> Result<()> {
        self.files.delete_render_cache(id, page_number).await?;
        OverlayRepository::new(&self.db)
            .record(&NewOverlay {
                document_id: id,
                page_number,
                target_id,
                target_kind,
                original_text,
                edited_text,
                bbox,
            })
            .await?;
        DocumentRepository::new(&self.db).touch(id).await?;
        info!(
            "Applied {} edit to {} on page {} of {}",
            target_kind.as_str(),
            target_id,
            page_number,
            id
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Concatenate uploaded PDFs into a new document.
    pub async fn merge(&self, files: Vec<UploadedFile>) -> Result<PdfDocument> {
        if files.len() < 2 {
            return Err(EngineError::UnsupportedInput(
                "At least two PDF files are required to merge".to_string(),
            )
            .into());
        }
        if let Some(bad) = files.iter().find(|f| !f.is_pdf_like()) {
            return Err(EngineError::UnsupportedInput(format!(
                "{} is not a PDF",
                bad.display_name()
            ))
            .into());
        }

        let id = Uuid::new_v4().to_string();
        let dest = self.files.document_path(&id);
        let sources = files.into_iter().map(|f| f.bytes).collect();
        let page_count = self.engine.merge(sources, dest.clone()).await?;

        let name = format!("merged_{}.pdf", &id[..8]);
        let record = self.create_record(&id, &name, &dest, page_count).await?;
        info!("Merged document {} ({} pages)", id, page_count);
        Ok(record)
    }

    /// Create one new document per page range.
    pub async fn split(&self, id: &str, page_ranges: &[String]) -> Result<Vec<PdfDocument>> {
        let doc = self.resolve(id).await?;
        if page_ranges.is_empty() {
            return Err(EngineError::UnsupportedInput("No page ranges given".to_string()).into());
        }
        let ranges = page_ranges
            .iter()
            .map(|r| parse_page_range(r, doc.record.pages()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let _guard = self.locks.acquire(id).await;

        let ids: Vec<String> = ranges.iter().map(|_| Uuid::new_v4().to_string()).collect();
        let dests: Vec<PathBuf> = ids.iter().map(|new_id| self.files.document_path(new_id)).collect();
        let counts = self
            .engine
            .split(doc.path.clone(), ranges.clone(), dests.clone())
            .await?;

        let stem = Path::new(&doc.record.original_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let mut records = Vec::with_capacity(ids.len());
        for (((new_id, dest), (start, end)), count) in
            ids.iter().zip(&dests).zip(&ranges).zip(counts)
        {
            let name = format!("{}_split_{}-{}.pdf", stem, start, end);
            records.push(self.create_record(new_id, &name, dest, count).await?);
        }

        info!("Split {} into {} documents", id, records.len());
        Ok(records)
    }

    /// Set an absolute rotation on pages and drop their cached renders.
    pub async fn rotate(&self, id: &str, page_numbers: &[usize], angle: i64) -> Result<PdfDocument> {
        let doc = self.resolve(id).await?;
        if !VALID_ANGLES.contains(&angle) {
            return Err(EngineError::UnsupportedInput(format!(
                "Rotation angle must be 90, 180 or 270, got {}",
                angle
            ))
            .into());
        }
        if page_numbers.is_empty() {
            return Err(EngineError::UnsupportedInput("No pages selected".to_string()).into());
        }
        for page_number in page_numbers {
            doc.check_page(*page_number)?;
        }

        let _guard = self.locks.acquire(id).await;
        self.engine
            .rotate(doc.path.clone(), page_numbers.to_vec(), angle)
            .await?;
        try_join_all(
            page_numbers
                .iter()
                .map(|page_number| self.files.delete_render_cache(id, *page_number)),
        )
        .await?;
        DocumentRepository::new(&self.db).touch(id).await?;

        info!("Rotated {} pages of {} to {}", page_numbers.len(), id, angle);
        self.get(id).await
    }

    /// Remove pages, renumbering everything after the first removed page.
    pub async fn delete_pages(&self, id: &str, page_numbers: &[usize]) -> Result<PdfDocument> {
        let doc = self.resolve(id).await?;
        let old_count = doc.record.pages();

        let mut unique = page_numbers.to_vec();
        unique.sort_unstable();
        unique.dedup();
        let Some(&first) = unique.first() else {
            return Err(EngineError::UnsupportedInput("No pages selected".to_string()).into());
        };
        for page_number in &unique {
            doc.check_page(*page_number)?;
        }
        if unique.len() >= old_count {
            return Err(EngineError::UnsupportedInput(
                "Cannot delete every page of a document".to_string(),
            )
            .into());
        }

        let _guard = self.locks.acquire(id).await;
        let new_count = self.engine.delete_pages(doc.path.clone(), unique).await?;

        self.files
            .delete_render_cache_range(id, first, old_count)
            .await?;
        DocumentRepository::new(&self.db)
            .update_page_count(id, new_count)
            .await?;

        info!("Deleted pages from {}: {} -> {} pages", id, old_count, new_count);
        self.get(id).await
    }
}
