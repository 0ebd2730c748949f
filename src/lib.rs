//! AeroPdf Server Library
//!
//! Block and word level editing of PDF documents over HTTP. Text is
//! extracted into a text map of blocks and words; edits white-out the
//! original region and redraw new text on top. Pages can be rendered,
//! merged, split, rotated and deleted.
//!
//! # Modules
//!
//! - `engine`: text maps, overlay edits, word wrap and page operations
//! - `mupdf`: structured text and rasterization via MuPDF
//! - `service`: document addressing, locking and render cache upkeep
//! - `routes`: the axum HTTP surface

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod locks;
pub mod mupdf;
pub mod routes;
pub mod service;
pub mod state;
pub mod storage;
