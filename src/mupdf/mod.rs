//! MuPDF adapter
//!
//! MuPDF's `fz_context` is not thread-safe, so every operation opens a fresh
//! document from bytes on the calling (blocking) thread and drops it when
//! done. Nothing from this module is held across an `.await`.
//!
//! MuPDF reports geometry with a top-left origin; [`stext`] converts it to
//! the bottom-left page space used everywhere else.

mod render;
mod stext;

pub use render::{encode_png, render_page};
pub use stext::collect_page;

use mupdf::{Document, Page};

use crate::engine::error::{check_page, Result};

/// Open an in-memory PDF.
pub fn open(bytes: &[u8]) -> Result<Document> {
    Ok(Document::from_bytes(bytes, "application/pdf")?)
}

pub fn page_count(doc: &Document) -> Result<usize> {
    Ok(doc.page_count()?.max(0) as usize)
}

/// Load a 1-based page after validating it against the page count.
pub fn load_page(doc: &Document, page_number: usize) -> Result<Page> {
    check_page(page_number, page_count(doc)?)?;
    Ok(doc.load_page(page_number as i32 - 1)?)
}
