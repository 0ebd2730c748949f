//! PDF engine
//!
//! Text-map extraction, overlay edits, rasterization and structural page
//! operations over documents stored on disk.
//!
//! MuPDF reads and renders; lopdf rewrites. All PDF work is CPU-bound and
//! runs on the blocking pool. Reads are bounded by a timeout; writes always
//! run to completion so a caller never gives up on a commit still in flight.
//! Each call opens the document fresh and releases it before returning, on
//! every exit path.

pub mod error;
pub mod extract;
pub mod geometry;
pub mod ledger;
pub mod metrics;
pub mod overlay;
pub mod page_text;
pub mod types;
pub mod visible;
pub mod wrap;
pub mod writer;

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

pub use error::{EngineError, Result};
pub use geometry::BoundingBox;
pub use metrics::{StandardFont, TextMeasurer};
pub use overlay::{EditConfig, OverlayEntry};
pub use types::{TextBlock, TextMap, Word, WordExtraction};

use crate::mupdf;
use visible::PlacedOverlay;

/// Read the overlay ledger for a page and place it in the page's displayed
/// space, tolerating documents lopdf cannot parse.
fn read_overlays(bytes: &[u8], page_number: usize) -> Vec<PlacedOverlay> {
    let doc = match writer::load(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Overlay ledger unavailable, reporting raw text: {}", e);
            return Vec::new();
        }
    };
    let Ok(page_id) = writer::page_id(&doc, page_number) else {
        return Vec::new();
    };

    let space = writer::page_space(&doc, page_id);
    ledger::read(&doc, page_id)
        .iter()
        .map(|entry| PlacedOverlay::new(entry, &space))
        .collect()
}

/// Build the text map of one page from document bytes.
///
/// Blocks and words come from one structured-text pass; a word failure is
/// reported per block and never takes the blocks down with it.
pub fn extract_text_map(bytes: &[u8], document_id: &str, page_number: usize) -> Result<TextMap> {
    let doc = mupdf::open(bytes)?;
    let page = mupdf::load_page(&doc, page_number)?;

    let snapshot = mupdf::collect_page(&page)?;
    let overlays = read_overlays(bytes, page_number);

    let text = visible::visible_text(&snapshot, &overlays);
    let blocks = extract::extract_blocks(&text, page_number);

    Ok(TextMap {
        document_id: document_id.to_string(),
        page_number,
        page_width: text.width,
        page_height: text.height,
        blocks,
    })
}

/// Rasterize one page of document bytes to PNG.
pub fn render_png(bytes: &[u8], page_number: usize, zoom: f32) -> Result<Vec<u8>> {
    let doc = mupdf::open(bytes)?;
    let page = mupdf::load_page(&doc, page_number)?;
    mupdf::render_page(&page, zoom)
}

/// Count pages of document bytes.
pub fn count_pages(bytes: &[u8]) -> Result<usize> {
    mupdf::page_count(&mupdf::open(bytes)?)
}

/// Apply a planned overlay to a stored document and persist it.
fn apply_overlay_file(
    path: &Path,
    page_number: usize,
    entry: &OverlayEntry,
) -> Result<OverlayEntry> {
    let bytes = std::fs::read(path)?;
    let mut doc = writer::load(&bytes)?;
    let recorded = writer::apply_overlay(&mut doc, page_number, entry)?;
    writer::save(&mut doc, path)?;
    Ok(recorded)
}

/// Async facade over the blocking engine functions
#[derive(Debug, Clone)]
pub struct PdfEngine {
    edit: EditConfig,
    render_zoom: f32,
    timeout: Duration,
}

impl PdfEngine {
    pub fn new(edit: EditConfig, render_zoom: f32, timeout: Duration) -> Self {
        Self {
            edit,
            render_zoom,
            timeout,
        }
    }

    /// Run a read on the blocking pool, giving up after the configured timeout.
    async fn run<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = tokio::task::spawn_blocking(task);
        match tokio::time::timeout(self.timeout, handle).await {
            Ok(joined) => joined?,
            Err(_) => Err(EngineError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Run a write on the blocking pool and wait for it to finish.
    ///
    /// Blocking tasks cannot be cancelled, so a timed-out write would still
    /// land later, after the caller released the document lock.
    async fn run_to_completion<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::task::spawn_blocking(task).await?
    }

    /// Page count of raw bytes, used to vet uploads.
    pub async fn page_count_of(&self, bytes: Vec<u8>) -> Result<usize> {
        self.run(move || count_pages(&bytes)).await
    }

    pub async fn page_count(&self, path: PathBuf) -> Result<usize> {
        self.run(move || count_pages(&std::fs::read(&path)?)).await
    }

    pub async fn text_map(
        &self,
        path: PathBuf,
        document_id: String,
        page_number: usize,
    ) -> Result<TextMap> {
        debug!("Extracting text map for {} page {}", document_id, page_number);
        self.run(move || extract_text_map(&std::fs::read(&path)?, &document_id, page_number))
            .await
    }

    pub async fn render(&self, path: PathBuf, page_number: usize) -> Result<Vec<u8>> {
        let zoom = self.render_zoom;
        self.run(move || render_png(&std::fs::read(&path)?, page_number, zoom))
            .await
    }

    /// White-out a block and redraw `new_text` wrapped inside it.
    pub async fn edit_block(
        &self,
        path: PathBuf,
        page_number: usize,
        bbox: BoundingBox,
        new_text: String,
    ) -> Result<OverlayEntry> {
        let entry = overlay::plan_block_edit(&bbox, &new_text, &self.edit)?;
        self.run_to_completion(move || apply_overlay_file(&path, page_number, &entry))
            .await
    }

    /// White-out a word and redraw `new_text` on one line.
    pub async fn edit_word(
        &self,
        path: PathBuf,
        page_number: usize,
        bbox: BoundingBox,
        new_text: String,
        size: Option<f32>,
    ) -> Result<OverlayEntry> {
        let entry = overlay::plan_word_edit(&bbox, &new_text, size, &self.edit)?;
        self.run_to_completion(move || apply_overlay_file(&path, page_number, &entry))
            .await
    }

    pub async fn rotate(&self, path: PathBuf, page_numbers: Vec<usize>, angle: i64) -> Result<()> {
        self.run_to_completion(move || {
            let mut doc = writer::load(&std::fs::read(&path)?)?;
            writer::rotate_pages(&mut doc, &page_numbers, angle)?;
            writer::save(&mut doc, &path)
        })
        .await
    }

    /// Remove pages and return the new page count.
    pub async fn delete_pages(&self, path: PathBuf, page_numbers: Vec<usize>) -> Result<usize> {
        self.run_to_completion(move || {
            let mut doc = writer::load(&std::fs::read(&path)?)?;
            writer::delete_pages(&mut doc, &page_numbers)?;
            writer::save(&mut doc, &path)?;
            Ok(writer::page_count(&doc))
        })
        .await
    }

    /// Merge sources in order into `dest` and return its page count.
    pub async fn merge(&self, sources: Vec<Vec<u8>>, dest: PathBuf) -> Result<usize> {
        self.run_to_completion(move || {
            let mut merged = writer::merge(&sources)?;
            writer::save(&mut merged, &dest)?;
            Ok(writer::page_count(&merged))
        })
        .await
    }

    /// Write each inclusive range of `path` to the matching destination.
    pub async fn split(
        &self,
        path: PathBuf,
        ranges: Vec<(usize, usize)>,
        dests: Vec<PathBuf>,
    ) -> Result<Vec<usize>> {
        self.run_to_completion(move || {
            let bytes = std::fs::read(&path)?;
            ranges
                .iter()
                .zip(dests.iter())
                .map(|((start, end), dest)| -> Result<usize> {
                    let mut part = writer::extract_range(&bytes, *start, *end)?;
                    writer::save(&mut part, dest)?;
                    Ok(writer::page_count(&part))
                })
                .collect()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use writer::fixtures::text_pdf;

    fn engine() -> PdfEngine {
        PdfEngine::new(EditConfig::default(), 1.0, Duration::from_secs(30))
    }

    fn stored(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_extract_hello_world() {
        let map = extract_text_map(&text_pdf(&["Hello World"]), "doc", 1).unwrap();
        assert!(map.page_width > 0.0 && map.page_height > 0.0);
        assert_eq!(map.blocks.len(), 1);
        let block = &map.blocks[0];
        assert_eq!(block.id, "page-1-block-1");
        assert_eq!(block.text, "Hello World");
        assert!(block.bbox.is_valid());
        // Text sits at y=700 in a 792pt tall page
        assert!(block.bbox.y0 > 650.0 && block.bbox.y1 < 760.0);

        let words: Vec<&str> = block.words.words().iter().map(|w| w.text.as_str()).collect();
        assert_eq!(words, vec!["Hello", "World"]);
        assert_eq!(block.words.words()[1].id, "page-1-block-1-word-2");
    }

    #[test]
    fn test_extract_out_of_range() {
        let result = extract_text_map(&text_pdf(&["Hello World"]), "doc", 999);
        assert!(matches!(
            result,
            Err(EngineError::OutOfRange { requested: 999, max: 1 })
        ));
        assert!(matches!(
            render_png(&text_pdf(&["x"]), 0, 1.0),
            Err(EngineError::OutOfRange { requested: 0, max: 1 })
        ));
    }

    #[test]
    fn test_garbage_is_a_read_error() {
        assert!(matches!(
            extract_text_map(b"not a pdf", "doc", 1),
            Err(EngineError::DocumentRead(_))
        ));
    }

    #[test]
    fn test_render_png() {
        let png = render_png(&text_pdf(&["Hello"]), 1, 0.5).unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_edit_then_clear_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let engine = engine();

        let map = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        let bbox = map.blocks[0].bbox;
        engine
            .edit_block(path.clone(), 1, bbox, "Edited".into())
            .await
            .unwrap();

        let edited = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        assert_eq!(edited.blocks.len(), 1);
        assert_eq!(edited.blocks[0].text, "Edited");
        assert_eq!(edited.blocks[0].words.words()[0].text, "Edited");

        engine
            .edit_block(path.clone(), 1, edited.blocks[0].bbox, String::new())
            .await
            .unwrap();
        let cleared = engine.text_map(path, "doc".into(), 1).await.unwrap();
        assert!(cleared.blocks.iter().all(|b| !b.text.trim().is_empty()));
        assert!(cleared.blocks.is_empty());
    }

    #[tokio::test]
    async fn test_block_can_be_edited_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let engine = engine();

        let map = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        engine
            .edit_block(path.clone(), 1, map.blocks[0].bbox, "Edited".into())
            .await
            .unwrap();
        let edited = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        assert!(edited.blocks[0].bbox.height() >= map.blocks[0].bbox.height());

        let entry = engine
            .edit_block(path.clone(), 1, edited.blocks[0].bbox, "Again".into())
            .await
            .unwrap();
        assert_eq!(entry.lines.len(), 1);

        let again = engine.text_map(path, "doc".into(), 1).await.unwrap();
        assert_eq!(again.blocks.len(), 1);
        assert_eq!(again.blocks[0].text, "Again");
        assert_eq!(again.blocks[0].words.words()[0].text, "Again");
    }

    #[tokio::test]
    async fn test_rotated_page_edit_lands_on_the_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let engine = engine();

        engine.rotate(path.clone(), vec![1], 90).await.unwrap();
        let map = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        // Displayed space of a letter page turned a quarter
        assert!(map.page_width > map.page_height);
        assert_eq!(map.blocks[0].text, "Hello World");

        let entry = engine
            .edit_block(path.clone(), 1, map.blocks[0].bbox, "Edited".into())
            .await
            .unwrap();
        assert_eq!(entry.rotation, 90);

        let edited = engine.text_map(path, "doc".into(), 1).await.unwrap();
        let texts: Vec<&str> = edited.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Edited"]);
    }

    #[tokio::test]
    async fn test_edit_survives_a_later_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let engine = engine();

        let map = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        engine
            .edit_block(path.clone(), 1, map.blocks[0].bbox, "Edited".into())
            .await
            .unwrap();
        engine.rotate(path.clone(), vec![1], 180).await.unwrap();

        let turned = engine.text_map(path, "doc".into(), 1).await.unwrap();
        let texts: Vec<&str> = turned.blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Edited"]);
        // Upside down, the block sits near the bottom of the displayed page
        assert!(turned.blocks[0].bbox.y1 < 150.0);
    }

    #[tokio::test]
    async fn test_writes_ignore_the_read_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let impatient = PdfEngine::new(EditConfig::default(), 1.0, Duration::ZERO);

        let bbox = extract_text_map(&std::fs::read(&path).unwrap(), "doc", 1)
            .unwrap()
            .blocks[0]
            .bbox;
        impatient
            .edit_block(path.clone(), 1, bbox, "Edited".into())
            .await
            .unwrap();

        let map = extract_text_map(&std::fs::read(&path).unwrap(), "doc", 1).unwrap();
        assert_eq!(map.blocks[0].text, "Edited");
    }

    #[tokio::test]
    async fn test_edit_word() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["Hello World"]));
        let engine = engine();

        let map = engine.text_map(path.clone(), "doc".into(), 1).await.unwrap();
        let word = map.find_word("page-1-block-1-word-2").unwrap().clone();
        let entry = engine
            .edit_word(path.clone(), 1, word.bbox, " There ".into(), None)
            .await
            .unwrap();
        assert_eq!(entry.lines[0].text, "There");

        let edited = engine.text_map(path, "doc".into(), 1).await.unwrap();
        let texts: Vec<&str> = edited.blocks.iter().map(|b| b.text.as_str()).collect();
        assert!(texts.contains(&"There"));
        assert!(texts.iter().all(|t| !t.contains("World")));
    }

    #[tokio::test]
    async fn test_invalid_geometry_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let original = text_pdf(&["Hello World"]);
        let path = stored(&dir, "doc.pdf", &original);

        let result = engine()
            .edit_block(path.clone(), 1, BoundingBox::new(5.0, 5.0, 5.0, 9.0), "x".into())
            .await;
        assert!(matches!(result, Err(EngineError::InvalidGeometry(_))));
        assert_eq!(std::fs::read(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn test_merge_second_source_becomes_page_two() {
        let dir = tempfile::tempdir().unwrap();
        let first = text_pdf(&["First page"]);
        let second = text_pdf(&["Second source"]);
        let dest = dir.path().join("merged.pdf");

        let count = engine()
            .merge(vec![first, second.clone()], dest.clone())
            .await
            .unwrap();
        assert_eq!(count, 2);

        let merged = extract_text_map(&std::fs::read(&dest).unwrap(), "m", 2).unwrap();
        let source = extract_text_map(&second, "s", 1).unwrap();
        assert_eq!(merged.blocks.len(), source.blocks.len());
        for (m, s) in merged.blocks.iter().zip(source.blocks.iter()) {
            assert_eq!(m.text, s.text);
            assert_eq!(m.bbox, s.bbox);
        }
    }

    #[tokio::test]
    async fn test_split_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let path = stored(&dir, "doc.pdf", &text_pdf(&["a", "b", "c"]));
        let engine = engine();

        let counts = engine
            .split(
                path.clone(),
                vec![(1, 1), (2, 3)],
                vec![dir.path().join("p1.pdf"), dir.path().join("p2.pdf")],
            )
            .await
            .unwrap();
        assert_eq!(counts, vec![1, 2]);

        let remaining = engine.delete_pages(path.clone(), vec![1]).await.unwrap();
        assert_eq!(remaining, 2);
        assert_eq!(engine.page_count(path).await.unwrap(), 2);
    }
}
