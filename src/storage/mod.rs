//! Local file store
//!
//! PDFs live at `<pdf_dir>/<id>.pdf`; rendered pages are cached as
//! `<render_dir>/<id>_page_<n>.png`. The cache path is opaque storage for
//! PNG bytes and is invalidated whenever a page's visual content changes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;

use crate::engine::EngineError;
use crate::error::Result;

#[derive(Clone)]
pub struct FileStore {
    inner: Arc<FileStoreInner>,
}

struct FileStoreInner {
    pdf_dir: PathBuf,
    render_dir: PathBuf,
}

impl FileStore {
    pub fn new(pdf_dir: impl Into<PathBuf>, render_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(FileStoreInner {
                pdf_dir: pdf_dir.into(),
                render_dir: render_dir.into(),
            }),
        }
    }

    /// Create both storage directories.
    pub async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.inner.pdf_dir).await?;
        fs::create_dir_all(&self.inner.render_dir).await?;
        Ok(())
    }

    /// Where a document's bytes live, whether or not they exist yet
    pub fn document_path(&self, id: &str) -> PathBuf {
        self.inner.pdf_dir.join(format!("{}.pdf", id))
    }

    /// Resolve an existing document file.
    pub async fn path_for_document(&self, id: &str) -> Result<PathBuf> {
        let path = self.document_path(id);
        if fs::try_exists(&path).await.unwrap_or(false) {
            Ok(path)
        } else {
            Err(EngineError::NotFound(format!("PDF file for document {}", id)).into())
        }
    }

    /// Store uploaded bytes under a fresh id and return the path.
    pub async fn save_document(&self, id: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.document_path(id);
        write_atomic(&path, bytes).await?;
        tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    pub async fn read_document(&self, id: &str) -> Result<Vec<u8>> {
        let path = self.path_for_document(id).await?;
        Ok(fs::read(path).await?)
    }

    pub fn render_cache_path(&self, id: &str, page_number: usize) -> PathBuf {
        self.inner
            .render_dir
            .join(format!("{}_page_{}.png", id, page_number))
    }

    /// Cached PNG for a page, if present
    pub async fn read_render_cache(&self, id: &str, page_number: usize) -> Option<Vec<u8>> {
        fs::read(self.render_cache_path(id, page_number)).await.ok()
    }

    pub async fn write_render_cache(&self, id: &str, page_number: usize, png: &[u8]) -> Result<()> {
        write_atomic(&self.render_cache_path(id, page_number), png).await
    }

    /// Drop the cached render of one page. Missing entries are fine.
    pub async fn delete_render_cache(&self, id: &str, page_number: usize) -> Result<()> {
        match fs::remove_file(self.render_cache_path(id, page_number)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop cached renders for pages `from..=to`.
    pub async fn delete_render_cache_range(&self, id: &str, from: usize, to: usize) -> Result<()> {
        for page_number in from..=to {
            self.delete_render_cache(id, page_number).await?;
        }
        Ok(())
    }
}

/// Write through a sibling temp file so readers never see a partial file.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("part");
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}
